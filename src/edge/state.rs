use crate::core::config::BackendConfig;
use crate::rpc::client::MarketplaceClient;
use crate::rpc::transport::{HttpRpcTransport, RpcTransport};
use std::sync::Arc;

/// Shared state for every endpoint
#[derive(Clone)]
pub struct EdgeState {
    pub config: Arc<BackendConfig>,
    /// Calls made with the anon key, scoped per request to the caller's JWT
    pub client: MarketplaceClient,
    /// Calls made with the service role key; absent when it is not configured
    pub service_client: Option<MarketplaceClient>,
}

impl EdgeState {
    pub fn from_config(config: BackendConfig) -> Self {
        let client = MarketplaceClient::new(Arc::new(HttpRpcTransport::from_config(&config)));
        let service_client = config.service_role_key.as_ref().map(|key| {
            MarketplaceClient::new(Arc::new(HttpRpcTransport::new(&config.url, key)))
        });
        Self {
            config: Arc::new(config),
            client,
            service_client,
        }
    }

    /// State backed by arbitrary transports
    pub fn with_transports(
        config: BackendConfig,
        anon: Arc<dyn RpcTransport>,
        service: Option<Arc<dyn RpcTransport>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            client: MarketplaceClient::new(anon),
            service_client: service.map(MarketplaceClient::new),
        }
    }

    /// Whether `token` may trigger maintenance procedures
    pub fn is_maintenance_token(&self, token: &str) -> bool {
        [&self.config.cron_secret, &self.config.service_role_key]
            .into_iter()
            .flatten()
            .any(|secret| !secret.is_empty() && secret == token)
    }
}
