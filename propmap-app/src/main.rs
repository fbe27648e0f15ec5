use propmap::{edge, BackendConfig};

/// Serverless marketplace endpoints
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    propmap::init_logging();

    let config = BackendConfig::from_env()?;
    log::info!("forwarding to backend at {}", config.url);

    edge::serve_with_shutdown(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for shutdown signal: {}", e);
        }
        log::info!("shutdown signal received");
    })
    .await?;

    Ok(())
}
