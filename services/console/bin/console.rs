//! Main entrypoint for the Xiaoling interaction console.
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Running one interactive session against the voice service.

use anyhow::Context;
use tracing::info;
use xiaoling_console::{config::Config, session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    info!(device_id = %config.device_id, "Starting interaction console");

    tokio::select! {
        result = session::run(&config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal. Shutting down gracefully...");
            Ok(())
        }
    }
}
