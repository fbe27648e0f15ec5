use crate::core::config::{CacheConfig, FetchConfig};
use crate::query::key::QueryKey;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    updated_at: Instant,
    last_used: Instant,
    invalidated: bool,
}

/// A cached value together with its freshness at lookup time
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<V> {
    pub value: V,
    pub is_stale: bool,
}

/// Keyed query results with freshness and retention tracking.
///
/// Entries are fresh for `stale_time` after they were written. Stale entries
/// are still returned by [`QueryCache::get`] for stale-while-revalidate
/// display, and are evicted once unused for `gc_time`. The LRU capacity puts
/// a hard bound on the number of keys. Clones share the same storage.
#[derive(Debug)]
pub struct QueryCache<V> {
    entries: Arc<Mutex<LruCache<QueryKey, CacheEntry<V>>>>,
    stale_time: Duration,
    gc_time: Duration,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(capacity: usize, stale_time: Duration, gc_time: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            stale_time,
            gc_time,
        }
    }

    pub fn from_config(fetch: &FetchConfig, cache: &CacheConfig) -> Self {
        Self::new(cache.capacity, fetch.stale_time(), fetch.gc_time())
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        !entry.invalidated && now.saturating_duration_since(entry.updated_at) < self.stale_time
    }

    /// Returns the value only while it is fresh
    pub fn get_fresh(&self, key: &QueryKey) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock().ok()?;
        let fresh = entries.peek(key).map(|e| self.is_fresh(e, now))?;
        if !fresh {
            return None;
        }
        let entry = entries.get_mut(key)?;
        entry.last_used = now;
        Some(entry.value.clone())
    }

    /// Returns the value whether fresh or stale
    pub fn get(&self, key: &QueryKey) -> Option<CachedValue<V>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().ok()?;
        let is_stale = !entries.peek(key).map(|e| self.is_fresh(e, now))?;
        let entry = entries.get_mut(key)?;
        entry.last_used = now;
        Some(CachedValue {
            value: entry.value.clone(),
            is_stale,
        })
    }

    pub fn insert(&self, key: QueryKey, value: V) {
        let now = Instant::now();
        self.sweep();
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key,
                CacheEntry {
                    value,
                    updated_at: now,
                    last_used: now,
                    invalidated: false,
                },
            );
        }
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries
            .lock()
            .ok()
            .map(|entries| entries.contains(key))
            .unwrap_or(false)
    }

    /// Marks one entry stale so the next read refetches; returns whether it existed
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        self.entries
            .lock()
            .ok()
            .and_then(|mut entries| entries.peek_mut(key).map(|e| e.invalidated = true))
            .is_some()
    }

    /// Marks every entry whose key starts with `prefix` stale
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        count
    }

    pub fn remove(&self, key: &QueryKey) -> Option<V> {
        self.entries.lock().ok()?.pop(key).map(|e| e.value)
    }

    /// Evicts entries unused for at least `gc_time`; returns how many
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let expired: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.last_used) >= self.gc_time)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        if !expired.is_empty() {
            log::debug!("evicted {} unused query results", expired.len());
        }
        expired.len()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .ok()
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            stale_time: self.stale_time,
            gc_time: self.gc_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> QueryKey {
        QueryKey::new(s)
    }

    fn cache(capacity: usize) -> QueryCache<u32> {
        QueryCache::new(capacity, Duration::from_secs(30), Duration::from_secs(300))
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_window() {
        let cache = cache(8);
        cache.insert(key("a"), 1);
        assert_eq!(cache.get_fresh(&key("a")), Some(1));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get_fresh(&key("a")), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get_fresh(&key("a")), None);
        assert_eq!(
            cache.get(&key("a")),
            Some(CachedValue {
                value: 1,
                is_stale: true
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_evicts_unused_entries() {
        let cache = cache(8);
        cache.insert(key("old"), 1);
        cache.insert(key("used"), 2);

        tokio::time::advance(Duration::from_secs(200)).await;
        // Reading keeps an entry alive even when stale
        assert!(cache.get(&key("used")).is_some());

        tokio::time::advance(Duration::from_secs(150)).await;
        assert_eq!(cache.sweep(), 1);
        assert!(!cache.contains(&key("old")));
        assert!(cache.contains(&key("used")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation() {
        let cache = cache(8);
        cache.insert(key("map-data|a"), 1);
        cache.insert(key("map-data|b"), 2);
        cache.insert(key("search|a"), 3);

        assert!(cache.invalidate(&key("map-data|a")));
        assert!(!cache.invalidate(&key("missing")));
        assert_eq!(cache.get_fresh(&key("map-data|a")), None);

        assert_eq!(cache.invalidate_prefix("map-data|"), 2);
        assert_eq!(cache.get_fresh(&key("map-data|b")), None);
        assert_eq!(cache.get_fresh(&key("search|a")), Some(3));

        // A fresh write clears the invalidation
        cache.insert(key("map-data|a"), 10);
        assert_eq!(cache.get_fresh(&key("map-data|a")), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_bound() {
        let cache = cache(2);
        cache.insert(key("1"), 1);
        cache.insert(key("2"), 2);
        cache.insert(key("3"), 3);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key("1")));

        let shared = cache.clone();
        shared.clear();
        assert!(cache.is_empty());
    }
}
