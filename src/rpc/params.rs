//! Parameter shapes for the backend procedures.
//!
//! Every field is always serialized; absent filters travel as explicit
//! `null` so the procedure always receives the same parameter shape.

use crate::core::bounds::MapBounds;
use crate::model::filters::{ListingType, MapFilters, PropertyType};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetMapDataParams {
    pub p_north: f64,
    pub p_south: f64,
    pub p_east: f64,
    pub p_west: f64,
    pub p_zoom: i32,
    pub p_listing_type: Option<ListingType>,
    pub p_property_type: Option<PropertyType>,
    pub p_price_min: Option<f64>,
    pub p_price_max: Option<f64>,
    pub p_bedrooms_min: Option<u32>,
    pub p_bathrooms_min: Option<f64>,
    pub p_state: Option<String>,
    pub p_municipality: Option<String>,
}

impl GetMapDataParams {
    pub fn new(bounds: &MapBounds, zoom: i32, filters: &MapFilters) -> Self {
        let filters = filters.normalized();
        Self {
            p_north: bounds.north,
            p_south: bounds.south,
            p_east: bounds.east,
            p_west: bounds.west,
            p_zoom: zoom,
            p_listing_type: filters.listing_type,
            p_property_type: filters.property_type,
            p_price_min: filters.price_min,
            p_price_max: filters.price_max,
            p_bedrooms_min: filters.bedrooms_min,
            p_bathrooms_min: filters.bathrooms_min,
            p_state: filters.state,
            p_municipality: filters.municipality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchParams {
    pub p_query: String,
    pub p_listing_type: Option<ListingType>,
    pub p_property_type: Option<PropertyType>,
    pub p_price_min: Option<f64>,
    pub p_price_max: Option<f64>,
    pub p_bedrooms_min: Option<u32>,
    pub p_bathrooms_min: Option<f64>,
    pub p_state: Option<String>,
    pub p_municipality: Option<String>,
    pub p_colonia: Option<String>,
    pub p_limit: u32,
    pub p_offset: u32,
}

impl SearchParams {
    pub fn new(query: &str, filters: &MapFilters, limit: u32, offset: u32) -> Self {
        let filters = filters.normalized();
        Self {
            p_query: query.trim().to_string(),
            p_listing_type: filters.listing_type,
            p_property_type: filters.property_type,
            p_price_min: filters.price_min,
            p_price_max: filters.price_max,
            p_bedrooms_min: filters.bedrooms_min,
            p_bathrooms_min: filters.bathrooms_min,
            p_state: filters.state,
            p_municipality: filters.municipality,
            p_colonia: filters.colonia,
            p_limit: limit,
            p_offset: offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BumpParams {
    pub p_property_id: String,
}
