//! Prelude module for common propmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use propmap::prelude::*;`

pub use crate::core::{
    bounds::MapBounds,
    config::{
        AdaptiveDebounceConfig, BackendConfig, CacheConfig, DebounceConfig, DebounceStrategy,
        FetchConfig, PipelineOptions, PipelineProfile,
    },
    geo::LatLng,
    viewport::MapViewport,
};

pub use crate::model::{
    filters::{ListingType, MapFilters, PropertyType},
    property::{PropertyCluster, PropertyImage, PropertyMarker},
    response::{decode_map_data, DecodeIssue, DecodedMapData, MapDataResponse},
};

pub use crate::query::{
    cache::{CachedValue, QueryCache},
    fetcher::MapDataFetcher,
    key::{MapDataRequest, QueryKey},
    observer::{MapDataQuery, QueryState, QueryStatus},
};

pub use crate::debounce::{
    adaptive::{AdaptiveDebounce, FrameSampler},
    fixed::{Debouncer, FixedDebounce},
};

pub use crate::render::{
    markers::MarkerSurface,
    placeholder::PlaceholderSurface,
    surface::{RenderSurface, SurfaceEvent, SurfaceFrame, SurfaceKind},
};

pub use crate::rpc::{
    bump::BumpOutcome,
    client::MarketplaceClient,
    search::{SearchHit, SearchPage, SearchQuery},
    transport::{HttpRpcTransport, RpcRequest, RpcTransport},
};

pub use crate::pipeline::{MapDataPipeline, PipelineBuilder, PipelineEvent};
pub use crate::session::{AppContext, RoleView, UserRole};
pub use crate::offline::{CacheDecision, OfflinePolicy, OfflineShell};

pub use crate::{MapError, Result};

// Re-export commonly used external types
pub use fxhash::FxHashMap;
pub use serde_json::Value;
