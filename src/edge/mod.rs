//! Serverless endpoints
//!
//! Stateless HTTP handlers that check the caller's credentials and forward
//! to backend procedures. Every response is JSON and CORS permits any origin.

pub mod error;
pub mod routes;
pub mod state;

pub use error::EdgeError;
pub use routes::router;
pub use state::EdgeState;

use crate::core::config::BackendConfig;
use crate::Result;
use std::future::Future;
use std::net::SocketAddr;

/// Serves the endpoints until the process is stopped
pub async fn serve(config: BackendConfig) -> Result<()> {
    serve_with_shutdown(config, std::future::pending()).await
}

/// Serves the endpoints until `shutdown` resolves
pub async fn serve_with_shutdown<F>(config: BackendConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    if config.service_role_key.is_none() {
        log::warn!("SUPABASE_SERVICE_ROLE_KEY not set, maintenance endpoints will fail");
    }
    let app = router(EdgeState::from_config(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("edge endpoints listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("edge endpoints stopped");
    Ok(())
}
