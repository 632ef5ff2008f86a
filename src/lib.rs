pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // Gateway service module
mod utils;

use modules::logger;
use tracing::{error, info};

/// Run the gateway until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    // Config is resolved once and injected everywhere from here on
    let config = match modules::config::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            logger::init_logger(None);
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    logger::init_logger(config.log_dir.as_deref());

    let (server, handle) = proxy::AxumServer::start(config.proxy)
        .await
        .map_err(anyhow::Error::msg)?;
    info!("Gateway listening on {}", server.base_url());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server.stop();
    if let Err(e) = handle.await {
        error!("Gateway task ended abnormally: {}", e);
    }

    Ok(())
}
