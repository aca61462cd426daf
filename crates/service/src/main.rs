//! OpenPedals daemon (`pedald`).

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use openpedal_service::{ServiceConfig, ServiceDaemon};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pedald", version, about = "OpenPedals pedal pipeline daemon")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, default_value = "pedald.json")]
    config: PathBuf,

    /// Run against simulated pedals instead of real hardware ports.
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load(&cli.config).await?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone())),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting pedald");

    let daemon = if cli.simulate {
        ServiceDaemon::simulated(config).await?
    } else {
        // Platform hardware ports ship with the OS integration layer; the
        // daemon itself only knows the port contracts.
        bail!("no hardware port backend built in; run with --simulate");
    };

    daemon.run().await?;
    info!("pedald stopped");
    Ok(())
}
