//! Daemon lifecycle: build the pipeline, run it, tear it down.

use std::sync::Arc;

use openpedal_engine::{
    DeviceHiderPort, PedalInputPort, PedalPipeline, PipelineMonitor, VirtualOutputPort,
};
use openpedal_errors::prelude::*;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::sim::{LoggingOutput, NullHider, SimulatedPedals};

/// The running daemon: one pipeline plus a fault-logging task.
pub struct ServiceDaemon {
    pipeline: PedalPipeline,
    fault_task: tokio::task::JoinHandle<()>,
}

impl ServiceDaemon {
    /// Build the pipeline against caller-supplied ports.
    ///
    /// # Errors
    ///
    /// Fails if the curve cache cannot be read.
    pub async fn new(
        config: ServiceConfig,
        input: Arc<dyn PedalInputPort>,
        hider: Arc<dyn DeviceHiderPort>,
        output: Arc<dyn VirtualOutputPort>,
    ) -> anyhow::Result<Self> {
        let (pipeline, monitor) =
            PedalPipeline::start(input, hider, output, config.pipeline).await?;
        let fault_task = tokio::spawn(log_faults(monitor));
        Ok(Self {
            pipeline,
            fault_task,
        })
    }

    /// Build the pipeline against the simulated ports.
    ///
    /// # Errors
    ///
    /// Fails if the curve cache cannot be read.
    pub async fn simulated(config: ServiceConfig) -> anyhow::Result<Self> {
        info!("running against simulated pedals, no hardware will be touched");
        Self::new(
            config,
            SimulatedPedals::new(),
            NullHider::new(),
            LoggingOutput::new(),
        )
        .await
    }

    /// Run until interrupted, then shut the pipeline down in order.
    ///
    /// # Errors
    ///
    /// Fails if the final curve-cache flush fails.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("pedald running, press Ctrl-C to stop");
        if let Err(e) = tokio::signal::ctrl_c().await {
            // No signal handler means we can only run until killed.
            warn!(error = %e, "failed to install Ctrl-C handler");
        }

        info!("stop requested");
        self.pipeline.shutdown().await?;
        self.fault_task.abort();
        Ok(())
    }
}

async fn log_faults(mut monitor: PipelineMonitor) {
    while let Some(fault) = monitor.next_fault().await {
        match fault.severity() {
            ErrorSeverity::Error => error!(%fault, "pipeline fault"),
            _ => warn!(%fault, "pipeline fault"),
        }
    }
}
