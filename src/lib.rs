pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // Relay service module
mod utils;

use std::path::PathBuf;

use tracing::info;

pub use proxy::{build_router, AxumServer, RelayConfig};

/// Run the relay until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    let config_path = std::env::var_os(modules::CONFIG_PATH_ENV).map(PathBuf::from);
    let config = modules::load_app_config(config_path.as_deref())?;

    // Initialize logger
    modules::init_logger(&config.logging);
    info!(
        "Relaying to {} (request timeout {}s)",
        config.proxy.backend.base_url(),
        config.proxy.request_timeout
    );

    let (server, handle) = AxumServer::start(&config.proxy).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    server.stop();
    handle.await?;

    Ok(())
}
