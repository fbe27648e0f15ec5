pub mod cache;
pub mod fetcher;
pub mod key;
pub mod observer;

// Re-exports for convenience
pub use cache::QueryCache;
pub use fetcher::MapDataFetcher;
pub use key::{MapDataRequest, QueryKey};
pub use observer::{MapDataQuery, QueryState, QueryStatus};
