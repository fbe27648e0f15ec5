use crate::core::bounds::MapBounds;
use crate::core::viewport::{floor_zoom, MapViewport};
use crate::model::filters::MapFilters;
use std::fmt;

/// Scope prefix shared by every map-data key
pub const MAP_DATA_SCOPE: &str = "map-data";

/// Identity of a cached query result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the fetcher needs to resolve one map-data query
#[derive(Debug, Clone, PartialEq)]
pub struct MapDataRequest {
    pub bounds: Option<MapBounds>,
    pub zoom: f64,
    pub filters: MapFilters,
    pub enabled: bool,
}

impl MapDataRequest {
    pub fn new(bounds: Option<MapBounds>, zoom: f64, filters: MapFilters, enabled: bool) -> Self {
        Self {
            bounds,
            zoom,
            filters,
            enabled,
        }
    }

    pub fn for_viewport(viewport: &MapViewport, filters: MapFilters) -> Self {
        Self::new(Some(viewport.bounds), viewport.zoom, filters, true)
    }

    /// Suspended requests never reach the network
    pub fn is_active(&self) -> bool {
        self.enabled && self.bounds.is_some()
    }

    pub fn zoom_level(&self) -> i32 {
        floor_zoom(self.zoom)
    }

    pub fn bounds_key(&self) -> Option<String> {
        self.bounds.as_ref().map(MapBounds::normalize_key)
    }

    /// `(normalized bounds, floor(zoom), serialized filters)`
    pub fn query_key(&self) -> Option<QueryKey> {
        self.bounds_key().map(|bounds| {
            QueryKey(format!(
                "{}|{}|{}|{}",
                MAP_DATA_SCOPE,
                bounds,
                self.zoom_level(),
                self.filters.cache_fragment()
            ))
        })
    }
}
