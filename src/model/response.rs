//! Canonical map-data result and its schema-checked decoder
//!
//! The remote procedure's payload is not statically enforced, so decoding
//! validates every field on its own: a field with the wrong shape falls back
//! to its default and is reported as a [`DecodeIssue`], while a payload that
//! is not an object at all is rejected.

use crate::model::property::{PropertyCluster, PropertyMarker};
use crate::{MapError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of one map-data fetch.
///
/// When `is_clustered` is true `clusters` is authoritative and `properties`
/// may be empty; otherwise the reverse holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDataResponse {
    pub properties: Vec<PropertyMarker>,
    pub clusters: Vec<PropertyCluster>,
    pub total_count: u64,
    pub is_clustered: bool,
}

impl MapDataResponse {
    /// Default state used while the fetcher is suspended
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of items in whichever collection is authoritative
    pub fn authoritative_len(&self) -> usize {
        if self.is_clustered {
            self.clusters.len()
        } else {
            self.properties.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.authoritative_len() == 0 && self.total_count == 0
    }
}

/// A field that did not match the expected schema
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeIssue {
    pub field: String,
    pub problem: String,
}

impl DecodeIssue {
    fn new(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: problem.into(),
        }
    }
}

impl std::fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMapData {
    pub response: MapDataResponse,
    pub issues: Vec<DecodeIssue>,
}

/// Decodes a raw `get_map_data` payload into [`MapDataResponse`]
pub fn decode_map_data(value: Value) -> Result<DecodedMapData> {
    let mut issues = Vec::new();

    let object = match value {
        Value::Object(map) => map,
        Value::Null => {
            issues.push(DecodeIssue::new("$", "payload was null"));
            Map::new()
        }
        // Set-returning procedures wrap the single row in an array
        Value::Array(mut rows) => match rows.len() {
            0 => {
                issues.push(DecodeIssue::new("$", "payload was an empty array"));
                Map::new()
            }
            1 => match rows.pop() {
                Some(Value::Object(map)) => map,
                _ => {
                    return Err(MapError::Decode(
                        "map data row is not a JSON object".to_string(),
                    ))
                }
            },
            n => {
                return Err(MapError::Decode(format!(
                    "expected a single map data row, got {}",
                    n
                )))
            }
        },
        other => {
            return Err(MapError::Decode(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            )))
        }
    };

    let mut properties: Vec<PropertyMarker> = decode_items(&object, "properties", &mut issues);
    properties.retain(|marker| {
        let valid = marker.position().is_valid();
        if !valid {
            issues.push(DecodeIssue::new(
                format!("properties[id={}]", marker.id),
                "coordinates out of range",
            ));
        }
        valid
    });
    for marker in properties.iter_mut() {
        marker.sort_images();
    }

    let clusters: Vec<PropertyCluster> = decode_items(&object, "clusters", &mut issues);
    let is_clustered = decode_bool(&object, "is_clustered", &mut issues);

    let authoritative = if is_clustered {
        clusters.len()
    } else {
        properties.len()
    };
    let total_count = decode_count(&object, "total_count", &mut issues).unwrap_or(authoritative as u64);

    Ok(DecodedMapData {
        response: MapDataResponse {
            properties,
            clusters,
            total_count,
            is_clustered,
        },
        issues,
    })
}

fn decode_items<T: DeserializeOwned>(
    object: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<DecodeIssue>,
) -> Vec<T> {
    match object.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match serde_json::from_value::<T>(item.clone()) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    issues.push(DecodeIssue::new(format!("{}[{}]", field, i), e.to_string()));
                    None
                }
            })
            .collect(),
        Some(other) => {
            issues.push(DecodeIssue::new(
                field,
                format!("expected array, got {}", json_type(other)),
            ));
            Vec::new()
        }
    }
}

fn decode_bool(object: &Map<String, Value>, field: &str, issues: &mut Vec<DecodeIssue>) -> bool {
    match object.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            issues.push(DecodeIssue::new(
                field,
                format!("expected boolean, got {}", json_type(other)),
            ));
            false
        }
    }
}

fn decode_count(
    object: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<u64> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                Some(v)
            } else if let Some(v) = n.as_f64().filter(|v| v.is_finite() && *v >= 0.0) {
                Some(v as u64)
            } else {
                issues.push(DecodeIssue::new(field, format!("invalid count {}", n)));
                None
            }
        }
        // bigint columns arrive as strings through some drivers
        Some(Value::String(s)) => match s.trim().parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                issues.push(DecodeIssue::new(field, format!("invalid count '{}'", s)));
                None
            }
        },
        Some(other) => {
            issues.push(DecodeIssue::new(
                field,
                format!("expected number, got {}", json_type(other)),
            ));
            None
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::filters::{ListingType, PropertyType};
    use serde_json::json;

    #[test]
    fn test_missing_clusters_defaults() {
        let decoded = decode_map_data(json!({
            "properties": [
                {"id": "a", "lat": 19.4, "lng": -99.15, "price": 2500000.0},
                {"id": "b", "lat": 19.41, "lng": -99.16}
            ],
            "total_count": 2
        }))
        .unwrap();

        assert_eq!(decoded.response.clusters, Vec::new());
        assert!(!decoded.response.is_clustered);
        assert_eq!(decoded.response.properties.len(), 2);
        assert_eq!(decoded.response.total_count, 2);
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_null_marker_fields_fall_back_to_defaults() {
        let decoded = decode_map_data(json!({
            "properties": [
                {"id": "clean", "lat": 19.4, "lng": -99.15},
                {"id": "no-images", "lat": 19.4, "lng": -99.15, "images": null},
                {"id": "no-currency", "lat": 19.4, "lng": -99.15, "currency": null},
                {"id": "no-featured", "lat": 19.4, "lng": -99.15, "is_featured": null},
                {"id": "no-types", "lat": 19.4, "lng": -99.15,
                 "property_type": null, "listing_type": null,
                 "images": [{"url": "https://cdn.test/a.jpg", "position": null}]}
            ]
        }))
        .unwrap();

        assert!(decoded.issues.is_empty(), "{:?}", decoded.issues);
        let markers = &decoded.response.properties;
        assert_eq!(markers.len(), 5);
        assert!(markers.iter().all(|m| m.currency == "MXN"));
        assert!(markers.iter().all(|m| !m.is_featured));
        assert!(markers[1].images.is_empty());
        assert_eq!(markers[4].listing_type, ListingType::default());
        assert_eq!(markers[4].property_type, PropertyType::default());
        assert_eq!(markers[4].images[0].position, 0);
    }

    #[test]
    fn test_explicit_cluster_flag_is_respected() {
        let decoded = decode_map_data(json!({
            "is_clustered": true,
            "clusters": [{"id": 1, "lat": 19.4, "lng": -99.1, "count": 30, "expansion_zoom": 12}]
        }))
        .unwrap();
        assert!(decoded.response.is_clustered);
        assert_eq!(decoded.response.clusters.len(), 1);
        assert!(decoded.response.properties.is_empty());
        // total_count falls back to the authoritative collection size
        assert_eq!(decoded.response.total_count, 1);
    }

    #[test]
    fn test_wrong_field_types_fall_back_with_issues() {
        let decoded = decode_map_data(json!({
            "properties": "oops",
            "clusters": null,
            "total_count": "17",
            "is_clustered": "yes"
        }))
        .unwrap();
        assert!(decoded.response.properties.is_empty());
        assert!(!decoded.response.is_clustered);
        assert_eq!(decoded.response.total_count, 17);
        let fields: Vec<&str> = decoded.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["properties", "is_clustered"]);
    }

    #[test]
    fn test_bad_items_are_dropped() {
        let decoded = decode_map_data(json!({
            "properties": [
                {"id": "ok", "lat": 19.4, "lng": -99.1},
                {"id": "no-coords"},
                {"id": "far", "lat": 123.0, "lng": -99.1}
            ]
        }))
        .unwrap();
        assert_eq!(decoded.response.properties.len(), 1);
        assert_eq!(decoded.response.properties[0].id, "ok");
        assert_eq!(decoded.issues.len(), 2);
    }

    #[test]
    fn test_images_sorted_by_position() {
        let decoded = decode_map_data(json!({
            "properties": [{
                "id": "a", "lat": 19.4, "lng": -99.1,
                "images": [
                    {"url": "c.jpg", "position": 2},
                    {"url": "a.jpg", "position": 0},
                    {"url": "b.jpg", "position": 1}
                ]
            }]
        }))
        .unwrap();
        let marker = &decoded.response.properties[0];
        assert_eq!(marker.cover_image(), Some("a.jpg"));
        let urls: Vec<&str> = marker.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_payload_shapes() {
        let wrapped = decode_map_data(json!([{"total_count": 5, "is_clustered": false}])).unwrap();
        assert_eq!(wrapped.response.total_count, 5);

        let null = decode_map_data(Value::Null).unwrap();
        assert_eq!(null.response, MapDataResponse::empty());
        assert_eq!(null.issues.len(), 1);

        assert!(matches!(decode_map_data(json!("nope")), Err(MapError::Decode(_))));
        assert!(matches!(decode_map_data(json!([{}, {}])), Err(MapError::Decode(_))));
        assert!(matches!(decode_map_data(json!([1])), Err(MapError::Decode(_))));
    }
}
