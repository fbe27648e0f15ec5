use crate::core::constants::BOUNDS_KEY_PRECISION;
use crate::core::geo::LatLng;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Rectangular geographic extent in degrees.
///
/// Invariant: `north > south` and `east > west`. Extents crossing the
/// anti-meridian are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl MapBounds {
    /// Creates bounds, rejecting non-finite or inverted edges
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        let bounds = Self {
            north,
            south,
            east,
            west,
        };
        if !bounds.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "bounds must satisfy north > south and east > west, got N={} S={} E={} W={}",
                north, south, east, west
            )));
        }
        Ok(bounds)
    }

    /// Checks finiteness and edge ordering
    pub fn is_valid(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite())
            && self.north > self.south
            && self.east > self.west
    }

    /// Stable cache key: every edge quantized to 3 decimals (~111 m at the
    /// equator), ordered `north_south_east_west`.
    pub fn normalize_key(&self) -> String {
        format!(
            "{:.3}_{:.3}_{:.3}_{:.3}",
            quantize(self.north),
            quantize(self.south),
            quantize(self.east),
            quantize(self.west)
        )
    }

    /// Returns a copy with every edge quantized the same way as the key
    pub fn quantized(&self) -> Self {
        Self {
            north: quantize(self.north),
            south: quantize(self.south),
            east: quantize(self.east),
            west: quantize(self.west),
        }
    }

    /// Parses a key produced by [`MapBounds::normalize_key`]
    pub fn from_key(key: &str) -> Result<Self> {
        let parts: Vec<&str> = key.split('_').collect();
        if parts.len() != 4 {
            return Err(MapError::InvalidCoordinates(format!(
                "expected 4 key components, got {}",
                parts.len()
            )));
        }

        let mut edges = [0.0_f64; 4];
        for (edge, part) in edges.iter_mut().zip(parts.iter()) {
            *edge = part.parse::<f64>().map_err(|e| {
                MapError::InvalidCoordinates(format!("bad key component '{}': {}", part, e))
            })?;
        }

        Self::new(edges[0], edges[1], edges[2], edges[3])
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Checks if the bounds contain a point (edges inclusive)
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }
}

/// Rounds to the key precision and folds negative zero into positive zero
fn quantize(value: f64) -> f64 {
    let rounded = (value * BOUNDS_KEY_PRECISION).round() / BOUNDS_KEY_PRECISION;
    rounded + 0.0
}
