use crate::core::geo::LatLng;
use crate::model::filters::{ListingType, PropertyType};
use serde::{Deserialize, Deserializer, Serialize};

fn default_currency() -> String {
    "MXN".to_string()
}

/// Treats an explicit JSON `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn null_as_currency<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(default_currency))
}

/// Accepts either a JSON string or a JSON number as an identifier
fn flexible_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyImage {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: i32,
}

/// A single property projected for map display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMarker {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_currency", deserialize_with = "null_as_currency")]
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub listing_type: ListingType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub property_type: PropertyType,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub parking: Option<u32>,
    #[serde(default)]
    pub sqft: Option<f64>,
    /// Ordered by `position`
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<PropertyImage>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_featured: bool,
}

impl PropertyMarker {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(|img| img.url.as_str())
    }

    pub(crate) fn sort_images(&mut self) {
        self.images.sort_by_key(|img| img.position);
    }
}

/// Server-computed aggregate of nearby properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCluster {
    #[serde(alias = "cluster_id", deserialize_with = "flexible_id")]
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(alias = "property_count", alias = "point_count")]
    pub count: u64,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    /// Zoom at which the cluster breaks apart; opaque to the client
    #[serde(default)]
    pub expansion_zoom: Option<i32>,
}

impl PropertyCluster {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}
