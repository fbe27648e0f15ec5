//! Core constants for the map data pipeline.
//! Keeping them in a single place makes it easier to tweak pipeline-wide magic numbers.

/// Bounds are quantized to 3 decimal places (~111 m at the equator).
pub const BOUNDS_KEY_PRECISION: f64 = 1_000.0;

/// Results are served from cache without a refetch for this long.
pub const DEFAULT_STALE_TIME_MS: u64 = 30_000;

/// Unused cache entries are retained this long before eviction.
pub const DEFAULT_GC_TIME_MS: u64 = 5 * 60_000;

/// Retries after the first failed map-data attempt.
pub const DEFAULT_FETCH_RETRIES: u32 = 2;

/// Base delay between retries; doubled on every attempt.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Retry backoff never exceeds this.
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Fixed quiet period before committing new viewport bounds.
pub const DEFAULT_BOUNDS_DEBOUNCE_MS: u64 = 300;

/// Frames per adaptive measurement window.
pub const FRAME_WINDOW: usize = 10;

/// Adaptive delay used until the first window fills.
pub const DEFAULT_ADAPTIVE_DELAY_MS: u64 = 400;

/// Default number of distinct query keys held in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Full-text search page size.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Full-text search page size upper bound.
pub const MAX_SEARCH_LIMIT: u32 = 100;

/// Remote procedure names.
pub const RPC_GET_MAP_DATA: &str = "get_map_data";
pub const RPC_SEARCH_PROPERTIES_FTS: &str = "search_properties_fts";
pub const RPC_BUMP_PROPERTY: &str = "bump_property";
pub const RPC_CLEANUP_TILE_CACHE: &str = "cleanup_tile_cache";
pub const RPC_REFRESH_PROPERTIES_MONTHLY: &str = "refresh_properties_monthly";
pub const RPC_REFRESH_STATS_VIEWS: &str = "refresh_stats_views";
