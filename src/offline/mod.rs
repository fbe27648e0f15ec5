//! Offline app shell
//!
//! Decides which browser requests are served from the shell caches and
//! falls back to a bundled offline page when navigation fails without a
//! network. API, auth and analytics traffic is never cached.

pub mod cache;
pub mod policy;

pub use cache::{RuntimeCache, ShellResponse};
pub use policy::{CacheDecision, OfflinePolicy};

use crate::{MapError, Result};
use std::future::Future;
use url::Url;

const FALLBACK_OFFLINE_PAGE: &str = "<!doctype html><html><head><meta charset=\"utf-8\"><title>Offline</title></head><body><h1>You are offline</h1><p>Reconnect to keep browsing properties.</p></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRequest {
    pub method: String,
    pub url: String,
    pub is_navigation: bool,
}

impl ShellRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            is_navigation: false,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            is_navigation: true,
            ..Self::get(url)
        }
    }
}

/// Static and dynamic caches for one policy version
#[derive(Debug)]
pub struct OfflineShell {
    policy: OfflinePolicy,
    static_cache: RuntimeCache,
    dynamic_cache: RuntimeCache,
}

impl OfflineShell {
    pub fn new(policy: OfflinePolicy) -> Self {
        let static_cache = RuntimeCache::new(policy.static_cache_name(), policy.precache.len().max(1));
        let dynamic_cache = RuntimeCache::new(policy.dynamic_cache_name(), policy.runtime_capacity);
        Self {
            policy,
            static_cache,
            dynamic_cache,
        }
    }

    pub fn policy(&self) -> &OfflinePolicy {
        &self.policy
    }

    pub fn static_cache(&self) -> &RuntimeCache {
        &self.static_cache
    }

    pub fn dynamic_cache(&self) -> &RuntimeCache {
        &self.dynamic_cache
    }

    /// Stores the precache list. Fails when any listed path is missing or
    /// unsuccessful, so a half-installed shell is never activated.
    pub fn install(
        &mut self,
        responses: impl IntoIterator<Item = (String, ShellResponse)>,
    ) -> Result<()> {
        for (path, response) in responses {
            if !self.static_cache.put(&path, response) {
                return Err(MapError::Io(format!("precache of {} failed", path)));
            }
        }
        let missing: Vec<&String> = self
            .policy
            .precache
            .iter()
            .filter(|path| !self.static_cache.contains(path))
            .collect();
        if !missing.is_empty() {
            return Err(MapError::Io(format!("precache incomplete, missing {:?}", missing)));
        }
        log::info!(
            "installed {} with {} entries",
            self.static_cache.name(),
            self.static_cache.len()
        );
        Ok(())
    }

    /// Names of caches to delete when this version activates
    pub fn activate<S: AsRef<str>>(&self, existing: &[S]) -> Vec<String> {
        let stale = self.policy.stale_caches(existing);
        if !stale.is_empty() {
            log::info!("removing stale caches {:?}", stale);
        }
        stale
    }

    fn lookup(&mut self, url: &str) -> Option<ShellResponse> {
        let path = Url::parse(url).map(|u| u.path().to_string()).ok();
        self.dynamic_cache
            .get(url)
            .or_else(|| path.and_then(|p| self.static_cache.get(&p)))
    }

    fn store(&mut self, url: &str, response: &ShellResponse) {
        let path = Url::parse(url).map(|u| u.path().to_string()).ok();
        match path {
            Some(path) if self.policy.is_precached(&path) => {
                self.static_cache.put(&path, response.clone());
            }
            _ => {
                self.dynamic_cache.put(url, response.clone());
            }
        }
    }

    /// Offline page served when a navigation cannot reach the network
    pub fn resolve_navigation(&mut self) -> ShellResponse {
        let page = self.policy.offline_page.clone();
        self.static_cache
            .get(&page)
            .unwrap_or_else(|| ShellResponse::html(FALLBACK_OFFLINE_PAGE))
    }

    /// Serves `request`, calling `network` only when the policy requires it
    pub async fn respond<F, Fut>(&mut self, request: &ShellRequest, network: F) -> Result<ShellResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ShellResponse>>,
    {
        match self
            .policy
            .decide(&request.method, &request.url, request.is_navigation)
        {
            CacheDecision::Bypass => network().await,
            CacheDecision::CacheFirst => {
                if let Some(hit) = self.lookup(&request.url) {
                    return Ok(hit);
                }
                let response = network().await?;
                self.store(&request.url, &response);
                Ok(response)
            }
            CacheDecision::NetworkFirst => match network().await {
                Ok(response) if response.is_ok() => {
                    self.store(&request.url, &response);
                    Ok(response)
                }
                outcome => {
                    if let Some(cached) = self.lookup(&request.url) {
                        log::debug!("serving cached copy of {}", request.url);
                        return Ok(cached);
                    }
                    match outcome {
                        Err(e) if request.is_navigation => {
                            log::warn!("navigation to {} failed offline: {}", request.url, e);
                            Ok(self.resolve_navigation())
                        }
                        other => other,
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const ORIGIN: &str = "https://app.example.com";

    fn installed_shell() -> OfflineShell {
        let mut shell = OfflineShell::new(OfflinePolicy::default());
        let precache: Vec<(String, ShellResponse)> = shell
            .policy()
            .precache
            .iter()
            .map(|p| (p.clone(), ShellResponse::html(format!("static {}", p))))
            .collect();
        shell.install(precache).unwrap();
        shell
    }

    #[test]
    fn test_install_requires_every_precache_entry() {
        let mut shell = OfflineShell::new(OfflinePolicy::default());
        let err = shell
            .install(vec![("/".to_string(), ShellResponse::html("home"))])
            .unwrap_err();
        assert!(matches!(err, MapError::Io(_)));
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_offline_page() {
        let mut shell = installed_shell();
        let response = shell
            .respond(&ShellRequest::navigate(format!("{}/propiedades/abc", ORIGIN)), || async {
                Err(MapError::Network("offline".into()))
            })
            .await
            .unwrap();
        assert_eq!(response.body, b"static /offline.html".to_vec());

        // Non-navigation requests surface the failure
        let err = shell
            .respond(&ShellRequest::get(format!("{}/api/listings", ORIGIN)), || async {
                Err(MapError::Network("offline".into()))
            })
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_network_first_keeps_last_good_copy() {
        let mut shell = installed_shell();
        let url = format!("{}/propiedades", ORIGIN);
        shell
            .respond(&ShellRequest::navigate(url.clone()), || async {
                Ok(ShellResponse::html("listing page"))
            })
            .await
            .unwrap();

        let response = shell
            .respond(&ShellRequest::navigate(url), || async {
                Err(MapError::Network("offline".into()))
            })
            .await
            .unwrap();
        assert_eq!(response.body, b"listing page".to_vec());
    }

    #[tokio::test]
    async fn test_cache_first_skips_network_on_hit() {
        let mut shell = installed_shell();
        let calls = Cell::new(0);
        let url = format!("{}/_next/static/chunks/app.js", ORIGIN);
        for _ in 0..2 {
            shell
                .respond(&ShellRequest::get(url.clone()), || {
                    calls.set(calls.get() + 1);
                    async { Ok(ShellResponse::new(200, "text/javascript", "js")) }
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(shell.dynamic_cache().len(), 1);
    }

    #[tokio::test]
    async fn test_api_calls_are_never_cached() {
        let mut shell = installed_shell();
        let url = "https://demo.supabase.co/rest/v1/rpc/get_map_data";
        shell
            .respond(&ShellRequest::get(url), || async {
                Ok(ShellResponse::new(200, "application/json", "{}"))
            })
            .await
            .unwrap();
        assert!(shell.dynamic_cache().is_empty());
    }
}
