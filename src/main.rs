use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use btleplug::api::Manager as _;
use btleplug::platform::Manager;
use clap::Parser;
use log::info;

mod btle;
mod config;
mod decode;
mod error;
#[cfg(test)]
mod fake;
mod manager;
mod scanner;
mod session;
mod transport;

use crate::manager::ConnectionState;
use crate::transport::RadioTransport;

#[derive(Parser, Debug)]
#[command(about = "Connect to a BLE heart-rate sensor and log its readings")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config = config::AppConfig::load(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    info!("Target device: {}", config.device.name);

    let bt_manager = Manager::new().await?;
    let adapters = bt_manager.adapters().await?;
    let central = adapters
        .into_iter()
        .next()
        .context("no bluetooth adapter found")?;

    let transport: Arc<dyn RadioTransport> = Arc::new(btle::BtleTransport::new(central));

    // Desktop BLE stacks gate access at the system level, so the radio
    // permission is granted as far as this process can tell.
    let target = config.device.name.clone();
    let mut core = manager::Manager::new(
        transport,
        Box::new(move |identity| identity.name.as_deref() == Some(target.as_str())),
        true,
    );

    core.request().await;
    match core.current_state() {
        ConnectionState::Connected(identity) => {
            info!(
                "Connected to {} ({})",
                identity.name.as_deref().unwrap_or("unknown"),
                identity.address
            );
        }
        ConnectionState::Failed(kind) => anyhow::bail!("connection failed: {kind}"),
        other => anyhow::bail!("no device found (state: {other:?})"),
    }

    // Readings are logged as they arrive; returns when the sensor
    // disconnects. Reconnection is up to the user.
    core.run().await;
    if let ConnectionState::Failed(kind) = core.current_state() {
        info!("Session ended: {kind}");
    }

    Ok(())
}
