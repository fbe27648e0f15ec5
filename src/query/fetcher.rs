//! Remote map-data fetcher
//!
//! Resolves a [`MapDataRequest`] against the cache first and the
//! `get_map_data` procedure second. Concurrent callers asking for the same
//! key share one in-flight call, failed attempts are retried with backoff,
//! and nothing is cached when the final attempt fails. A shared call that
//! every caller abandons is dropped and leaves the registry.

use crate::core::bounds::MapBounds;
use crate::core::config::FetchConfig;
use crate::model::filters::MapFilters;
use crate::model::response::MapDataResponse;
use crate::query::cache::{CachedValue, QueryCache};
use crate::query::key::{MapDataRequest, QueryKey, MAP_DATA_SCOPE};
use crate::rpc::client::MarketplaceClient;
use crate::Result;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type SharedFetch = Shared<FetchFuture>;
type InFlight = Arc<Mutex<FxHashMap<QueryKey, (u64, WeakShared<FetchFuture>)>>>;
type FetchFuture = BoxFuture<'static, Result<Arc<MapDataResponse>>>;

static EMPTY_RESPONSE: Lazy<Arc<MapDataResponse>> =
    Lazy::new(|| Arc::new(MapDataResponse::empty()));

/// Shape returned while a request is suspended
pub fn empty_response() -> Arc<MapDataResponse> {
    EMPTY_RESPONSE.clone()
}

pub struct MapDataFetcher {
    client: MarketplaceClient,
    cache: QueryCache<Arc<MapDataResponse>>,
    config: FetchConfig,
    in_flight: InFlight,
    next_fetch_id: AtomicU64,
}

impl MapDataFetcher {
    pub fn new(
        client: MarketplaceClient,
        cache: QueryCache<Arc<MapDataResponse>>,
        config: FetchConfig,
    ) -> Self {
        Self {
            client,
            cache,
            config,
            in_flight: Arc::new(Mutex::new(FxHashMap::default())),
            next_fetch_id: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &QueryCache<Arc<MapDataResponse>> {
        &self.cache
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Resolves a request. Suspended requests (no bounds, or disabled) return
    /// the empty shape without touching the network.
    pub async fn fetch(&self, request: &MapDataRequest) -> Result<Arc<MapDataResponse>> {
        let (bounds, key) = match (request.is_active(), request.bounds, request.query_key()) {
            (true, Some(bounds), Some(key)) => (bounds, key),
            _ => return Ok(empty_response()),
        };

        if let Some(hit) = self.cache.get_fresh(&key) {
            log::debug!("map data cache hit for {}", key);
            return Ok(hit);
        }

        log::debug!("map data cache miss for {}", key);
        self.join_or_start(key, bounds, request.zoom_level(), request.filters.clone())
            .await
    }

    /// Cached value for a request in any freshness state
    pub fn peek(&self, request: &MapDataRequest) -> Option<CachedValue<Arc<MapDataResponse>>> {
        if !request.is_active() {
            return None;
        }
        request.query_key().and_then(|key| self.cache.get(&key))
    }

    /// Warms the cache for a viewport the user is likely to open. Failures
    /// are logged and dropped.
    pub async fn prefetch(&self, request: &MapDataRequest) {
        if let Err(e) = self.fetch(request).await {
            log::debug!("map data prefetch failed: {}", e);
        }
    }

    /// Whether regaining window focus should trigger a refetch for `request`
    pub fn should_refetch_on_focus(&self, request: &MapDataRequest) -> bool {
        self.config.refetch_on_window_focus
            && self
                .peek(request)
                .map(|cached| cached.is_stale)
                .unwrap_or(false)
    }

    /// Marks every map-data result stale
    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_prefix(MAP_DATA_SCOPE)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn join_or_start(
        &self,
        key: QueryKey,
        bounds: MapBounds,
        zoom: i32,
        filters: MapFilters,
    ) -> SharedFetch {
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("in-flight registry poisoned, fetching {} without dedup", key);
                return self.start_fetch(key, 0, bounds, zoom, filters);
            }
        };

        if let Some(pending) = in_flight.get(&key).and_then(|(_, weak)| weak.upgrade()) {
            log::debug!("joining in-flight request for {}", key);
            return pending;
        }

        let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed) + 1;
        let fetch = self.start_fetch(key.clone(), id, bounds, zoom, filters);
        if let Some(weak) = fetch.downgrade() {
            in_flight.insert(key, (id, weak));
        }
        fetch
    }

    fn start_fetch(
        &self,
        key: QueryKey,
        id: u64,
        bounds: MapBounds,
        zoom: i32,
        filters: MapFilters,
    ) -> SharedFetch {
        let client = self.client.clone();
        let config = self.config.clone();
        let cache = self.cache.clone();
        let entry = InFlightEntry {
            registry: self.in_flight.clone(),
            key: key.clone(),
            id,
        };

        async move {
            // Dropped on completion, or with the future when every caller gives up
            let _entry = entry;
            let result = fetch_with_retry(&client, &config, &bounds, zoom, &filters).await;

            if let Ok(data) = &result {
                cache.insert(key, data.clone());
            }
            result
        }
        .boxed()
        .shared()
    }
}

/// Removes its registry entry on drop, unless a newer fetch took the key over
struct InFlightEntry {
    registry: InFlight,
    key: QueryKey,
    id: u64,
}

impl Drop for InFlightEntry {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.registry.lock() {
            if in_flight.get(&self.key).map(|(owner, _)| *owner == self.id).unwrap_or(false) {
                in_flight.remove(&self.key);
            }
        }
    }
}

async fn fetch_with_retry(
    client: &MarketplaceClient,
    config: &FetchConfig,
    bounds: &MapBounds,
    zoom: i32,
    filters: &MapFilters,
) -> Result<Arc<MapDataResponse>> {
    let mut attempt: u32 = 0;
    loop {
        log::debug!("get_map_data z{} attempt {}", zoom, attempt + 1);
        match client.get_map_data(bounds, zoom, filters).await {
            Ok(decoded) => {
                for issue in &decoded.issues {
                    log::warn!("map data field defaulted: {}", issue);
                }
                log::info!(
                    "fetched map data z{} ({} properties, {} clusters)",
                    zoom,
                    decoded.response.properties.len(),
                    decoded.response.clusters.len()
                );
                return Ok(Arc::new(decoded.response));
            }
            Err(e) if e.is_retryable() && attempt < config.retry => {
                attempt += 1;
                let delay = config.retry_delay(attempt);
                log::warn!(
                    "get_map_data failed on attempt {}: {} (retrying in {:?})",
                    attempt,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!("giving up on map data after {} attempts: {}", attempt + 1, e);
                return Err(e);
            }
        }
    }
}
