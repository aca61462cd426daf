//! Hardware-free ports for running the daemon without devices.
//!
//! `pedald --simulate` wires these in: a synthetic three-pedal set that
//! sweeps its axes, a hider that always grants the lease, and an output
//! that logs writes instead of driving a joystick driver.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use openpedal_curves::PedalAxis;
use openpedal_engine::{
    AxisReadings, Device, DeviceHiderPort, DeviceId, ExclusiveLease, PedalInputPort, VirtualSlot,
    VirtualOutputPort,
};
use openpedal_errors::PipelineFault;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Synthetic pedal set sweeping each axis on its own period.
#[derive(Debug)]
pub struct SimulatedPedals {
    device: Device,
    started: Instant,
}

impl SimulatedPedals {
    /// One simulated three-pedal device.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            device: Device::standard_pedals(
                DeviceId::new(0xfeed, 0x0001, "SIM"),
                "Simulated Pedals",
            ),
            started: Instant::now(),
        })
    }

    /// Identity of the simulated device.
    pub fn id(&self) -> &DeviceId {
        &self.device.id
    }

    fn sweep(&self, axis: PedalAxis) -> f32 {
        // Triangle wave per axis, offset so the pedals move out of phase.
        let period = match axis {
            PedalAxis::Throttle => 4.0,
            PedalAxis::Brake => 3.0,
            PedalAxis::Clutch => 5.0,
            PedalAxis::Handbrake => 6.0,
        };
        let t = self.started.elapsed().as_secs_f32() % period / period;
        let tri = if t < 0.5 { t * 2.0 } else { 2.0 - t * 2.0 };
        tri * 65535.0
    }
}

#[async_trait]
impl PedalInputPort for SimulatedPedals {
    async fn enumerate(&self) -> Result<Vec<Device>, PipelineFault> {
        Ok(vec![self.device.clone()])
    }

    fn sample(&self, device: &DeviceId) -> Result<AxisReadings, PipelineFault> {
        if device != &self.device.id {
            return Err(PipelineFault::device_unavailable(
                device.as_str(),
                "not a simulated device",
            ));
        }
        Ok(self
            .device
            .axes
            .iter()
            .map(|descriptor| (descriptor.axis, self.sweep(descriptor.axis)))
            .collect())
    }
}

/// Hider that always grants the lease and logs the claim.
#[derive(Debug)]
pub struct NullHider {
    release_tx: mpsc::UnboundedSender<DeviceId>,
}

impl NullHider {
    /// Hider plus a task draining the release channel into the log.
    pub fn new() -> Arc<Self> {
        let (release_tx, mut release_rx) = mpsc::unbounded_channel::<DeviceId>();
        tokio::spawn(async move {
            while let Some(id) = release_rx.recv().await {
                debug!(device = %id, "lease released, device visible again");
            }
        });
        Arc::new(Self { release_tx })
    }
}

#[async_trait]
impl DeviceHiderPort for NullHider {
    async fn claim(&self, device: &DeviceId) -> Result<ExclusiveLease, PipelineFault> {
        debug!(device = %device, "lease granted");
        Ok(ExclusiveLease::new(device.clone(), self.release_tx.clone()))
    }
}

/// Output that logs slot values at a throttled cadence instead of writing
/// to a joystick driver.
#[derive(Debug, Default)]
pub struct LoggingOutput {
    last_logged: Mutex<Option<Instant>>,
}

impl LoggingOutput {
    /// Logging stand-in for the virtual joystick.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl VirtualOutputPort for LoggingOutput {
    fn emit(&self, slot: VirtualSlot, value: f32) -> Result<(), PipelineFault> {
        // Once a second is plenty for a human-readable trace.
        let mut last = self.last_logged.lock();
        let due = last.is_none_or(|at| at.elapsed().as_secs_f32() >= 1.0);
        if due && slot == VirtualSlot(0) {
            *last = Some(Instant::now());
            info!(%slot, value, "virtual output");
        }
        Ok(())
    }
}
