use crate::core::bounds::MapBounds;
use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};

/// Snapshot of the map library's current view.
///
/// Produced from map-library events; the fetch pipeline only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    /// Visible extent
    pub bounds: MapBounds,
    /// Fractional zoom level as reported by the map library
    pub zoom: f64,
    /// Center of the view
    pub center: LatLng,
}

impl MapViewport {
    pub fn new(bounds: MapBounds, zoom: f64) -> Self {
        Self {
            bounds,
            zoom,
            center: bounds.center(),
        }
    }

    pub fn with_center(mut self, center: LatLng) -> Self {
        self.center = center;
        self
    }

    /// Integer zoom used for cache keys and the remote call
    pub fn zoom_level(&self) -> i32 {
        floor_zoom(self.zoom)
    }
}

/// Floors a fractional zoom, mapping non-finite input to 0
pub fn floor_zoom(zoom: f64) -> i32 {
    if zoom.is_finite() {
        zoom.floor() as i32
    } else {
        0
    }
}
