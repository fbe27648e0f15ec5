//! Per-view query state on top of the shared fetcher
//!
//! A [`MapDataQuery`] follows whichever request its view last asked for. It
//! keeps showing the previous successful result while a new one loads and
//! when a fetch fails, and it ignores responses that arrive for a key the
//! view has already moved away from.

use crate::model::response::MapDataResponse;
use crate::query::fetcher::{empty_response, MapDataFetcher};
use crate::query::key::{MapDataRequest, QueryKey};
use crate::MapError;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Suspended: no bounds yet, or disabled
    Idle,
    /// First fetch in progress, nothing to show yet
    Loading,
    Success,
    /// Final attempt failed; `data` still holds the last good result
    Error,
}

#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Arc<MapDataResponse>,
    pub error: Option<MapError>,
    pub key: Option<QueryKey>,
    /// A fetch for `key` is outstanding
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
}

impl QueryState {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: empty_response(),
            error: None,
            key: None,
            is_fetching: false,
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_fetching
    }
}

pub struct MapDataQuery {
    fetcher: Arc<MapDataFetcher>,
    state: Mutex<QueryState>,
    mounted: std::sync::atomic::AtomicBool,
}

impl MapDataQuery {
    pub fn new(fetcher: Arc<MapDataFetcher>) -> Self {
        Self {
            fetcher,
            state: Mutex::new(QueryState::idle()),
            mounted: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn fetcher(&self) -> &Arc<MapDataFetcher> {
        &self.fetcher
    }

    pub fn state(&self) -> QueryState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn data(&self) -> Arc<MapDataResponse> {
        self.state().data
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Detaches the view; outstanding responses are no longer applied
    pub fn unmount(&self) {
        self.mounted.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut QueryState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Points the query at `request` and resolves it
    pub async fn update(&self, request: &MapDataRequest) -> QueryState {
        if !self.is_mounted() {
            return self.state();
        }

        let key = match (request.is_active(), request.query_key()) {
            (true, Some(key)) => key,
            _ => {
                return self.with_state(|state| {
                    *state = QueryState::idle();
                    state.clone()
                })
            }
        };

        if let Some(cached) = self.fetcher.peek(request) {
            if !cached.is_stale {
                return self.with_state(|state| {
                    state.key = Some(key.clone());
                    state.data = cached.value.clone();
                    state.status = QueryStatus::Success;
                    state.error = None;
                    state.is_fetching = false;
                    state.clone()
                });
            }
        }

        let placeholder = self.fetcher.peek(request).map(|c| c.value);
        self.with_state(|state| {
            state.key = Some(key.clone());
            state.is_fetching = true;
            if let Some(stale) = placeholder {
                state.data = stale;
            }
            if state.status == QueryStatus::Idle {
                state.status = QueryStatus::Loading;
            }
        });

        let result = self.fetcher.fetch(request).await;

        if !self.is_mounted() {
            log::debug!("dropping map data for {} after unmount", key);
            return self.state();
        }

        self.with_state(|state| {
            if state.key.as_ref() != Some(&key) {
                log::debug!("discarding map data for superseded key {}", key);
                return state.clone();
            }
            state.is_fetching = false;
            match result {
                Ok(data) => {
                    state.data = data;
                    state.status = QueryStatus::Success;
                    state.error = None;
                    state.updated_at = Some(Instant::now());
                }
                Err(e) => {
                    log::warn!("map data fetch for {} failed: {}", key, e);
                    state.status = QueryStatus::Error;
                    state.error = Some(e);
                }
            }
            state.clone()
        })
    }

    /// Refetches the current key, bypassing freshness
    pub async fn refetch(&self, request: &MapDataRequest) -> QueryState {
        if let Some(key) = request.query_key() {
            self.fetcher.cache().invalidate(&key);
        }
        self.update(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounds::MapBounds;
    use crate::core::config::{CacheConfig, FetchConfig};
    use crate::model::filters::MapFilters;
    use crate::query::cache::QueryCache;
    use crate::rpc::client::MarketplaceClient;
    use crate::rpc::scripted::ScriptedTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn query_with(transport: Arc<ScriptedTransport>) -> Arc<MapDataQuery> {
        let config = FetchConfig::default();
        let cache = QueryCache::from_config(&config, &CacheConfig::default());
        let fetcher = MapDataFetcher::new(MarketplaceClient::new(transport), cache, config);
        Arc::new(MapDataQuery::new(Arc::new(fetcher)))
    }

    fn request(north: f64) -> MapDataRequest {
        MapDataRequest::new(
            Some(MapBounds::new(north, north - 0.2, -99.1, -99.2).unwrap()),
            12.0,
            MapFilters::default(),
            true,
        )
    }

    fn payload(id: &str) -> serde_json::Value {
        json!({"properties": [{"id": id, "lat": 19.4, "lng": -99.15}], "total_count": 1})
    }

    #[tokio::test]
    async fn test_idle_when_suspended() {
        let transport = Arc::new(ScriptedTransport::returning(payload("a")));
        let query = query_with(transport.clone());

        let state = query.update(&MapDataRequest::new(None, 10.0, MapFilters::default(), true)).await;
        assert_eq!(state.status, QueryStatus::Idle);
        assert!(state.data.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_data() {
        let fail = Arc::new(AtomicBool::new(false));
        let flag = fail.clone();
        let transport = Arc::new(ScriptedTransport::new(move |req| {
            if flag.load(Ordering::SeqCst) {
                Err(crate::MapError::Network("down".into()))
            } else {
                let north = req.params["p_north"].as_f64().unwrap_or_default();
                Ok(payload(&format!("n{}", north)))
            }
        }));
        let query = query_with(transport.clone());

        let ok = query.update(&request(19.5)).await;
        assert_eq!(ok.status, QueryStatus::Success);
        assert_eq!(ok.data.properties[0].id, "n19.5");

        fail.store(true, Ordering::SeqCst);
        let failed = query.update(&request(19.7)).await;
        assert_eq!(failed.status, QueryStatus::Error);
        assert!(failed.error.is_some());
        assert_eq!(failed.data.properties[0].id, "n19.5");
        assert!(!failed.is_fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_response_is_not_applied() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            let north = req.params["p_north"].as_f64().unwrap_or_default();
            Ok(payload(&format!("n{}", north)))
        }).with_latency(Duration::from_millis(500)));
        let query = query_with(transport.clone());

        let slow = {
            let query = query.clone();
            tokio::spawn(async move { query.update(&request(19.5)).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let latest = query.update(&request(19.9)).await;
        let superseded = slow.await.unwrap();

        assert_eq!(latest.data.properties[0].id, "n19.9");
        assert_eq!(query.data().properties[0].id, "n19.9");
        // The older response still landed in the cache under its own key
        assert_eq!(superseded.key, latest.key);
        assert!(query.fetcher().peek(&request(19.5)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmounted_query_ignores_results() {
        let transport = Arc::new(ScriptedTransport::returning(payload("a")));
        let query = query_with(transport.clone());
        query.unmount();

        let state = query.update(&request(19.5)).await;
        assert_eq!(state.status, QueryStatus::Idle);
        assert_eq!(transport.call_count(), 0);
    }
}
