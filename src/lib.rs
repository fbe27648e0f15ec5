//! # propmap
//!
//! Viewport-driven property map data for a real-estate marketplace.
//!
//! Raw map viewports flow through a debounce layer (fixed or frame-rate
//! adaptive), are normalized into stable cache keys, and are resolved by a
//! caching, deduplicating fetcher that calls the hosted backend's
//! `get_map_data` procedure. Results are handed to a swappable rendering
//! surface. The crate also carries the thin serverless endpoints that forward
//! to backend procedures and the offline app-shell cache policy.

pub mod core;
pub mod debounce;
#[cfg(feature = "edge")]
pub mod edge;
pub mod model;
pub mod offline;
pub mod pipeline;
pub mod prelude;
pub mod query;
pub mod render;
pub mod rpc;
pub mod session;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::MapBounds,
    config::{BackendConfig, PipelineOptions, PipelineProfile},
    geo::LatLng,
    viewport::MapViewport,
};

pub use model::{
    filters::{ListingType, MapFilters, PropertyType},
    property::{PropertyCluster, PropertyImage, PropertyMarker},
    response::MapDataResponse,
};

pub use query::{
    cache::QueryCache,
    fetcher::MapDataFetcher,
    key::{MapDataRequest, QueryKey},
    observer::{MapDataQuery, QueryStatus},
};

pub use debounce::{adaptive::AdaptiveDebounce, adaptive::FrameSampler, fixed::FixedDebounce};

pub use render::{surface::RenderSurface, surface::SurfaceEvent, surface::SurfaceKind};

pub use rpc::{client::MarketplaceClient, transport::RpcTransport};

pub use pipeline::{MapDataPipeline, PipelineBuilder, PipelineEvent};

pub use session::{AppContext, UserRole};

pub use offline::{OfflinePolicy, OfflineShell};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
///
/// Cloneable so a single in-flight fetch outcome can be handed to every
/// caller waiting on the same query key.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote procedure `{function}` failed ({status}): {message}")]
    Remote {
        function: String,
        status: u16,
        message: String,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl MapError {
    /// Transport failures and server-side (5xx or unknown) failures are worth
    /// another attempt; validation, authorization and decoding are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            MapError::Network(_) | MapError::Io(_) => true,
            MapError::Remote { status, .. } => *status == 0 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for MapError {
    fn from(err: reqwest::Error) -> Self {
        MapError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for MapError {
    fn from(err: std::io::Error) -> Self {
        MapError::Io(err.to_string())
    }
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger`, honouring `RUST_LOG` and defaulting to `info`
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
