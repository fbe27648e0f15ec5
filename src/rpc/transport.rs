use crate::{MapError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::Value;

/// Shared async HTTP client. Building the client once avoids the cost of TLS
/// and connection pool setup for every procedure call.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("propmap/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            Client::new()
        })
});

/// One invocation of a backend stored procedure
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub function: String,
    pub params: Value,
    /// Caller's session token; the transport's own key is used when absent
    pub bearer: Option<String>,
}

impl RpcRequest {
    pub fn new(function: impl Into<String>, params: Value) -> Self {
        Self {
            function: function.into(),
            params,
            bearer: None,
        }
    }

    pub fn with_bearer(mut self, bearer: Option<String>) -> Self {
        self.bearer = bearer;
        self
    }
}

/// Anything that can execute a remote procedure and return its JSON payload
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, request: RpcRequest) -> Result<Value>;
}

/// Calls procedures through the hosted backend's REST gateway
/// (`POST {url}/rest/v1/rpc/{function}`).
#[derive(Debug, Clone)]
pub struct HttpRpcTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpRpcTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &crate::core::config::BackendConfig) -> Self {
        Self::new(&config.url, &config.anon_key)
    }

    pub fn endpoint(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
    async fn call(&self, request: RpcRequest) -> Result<Value> {
        let url = self.endpoint(&request.function);
        let token = request.bearer.as_deref().unwrap_or(&self.api_key);
        log::debug!("rpc {} -> {}", request.function, url);

        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .json(&request.params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(error_from_response(&request.function, status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Maps a failed gateway response onto the error taxonomy. Row-level
/// security rejections are reported as-is through `Unauthorized`.
pub fn error_from_response(function: &str, status: u16, body: &str) -> MapError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let message = field("message")
        .or_else(|| field("error"))
        .unwrap_or_else(|| body.trim().to_string());
    let code = field("code").unwrap_or_default();

    if status == 401 || status == 403 || code == "42501" || code == "PGRST301" {
        MapError::Unauthorized(message)
    } else {
        MapError::Remote {
            function: function.to_string(),
            status,
            message,
        }
    }
}
