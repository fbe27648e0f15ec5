use crate::core::constants::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use crate::model::filters::{ListingType, MapFilters, PropertyType};
use serde::{Deserialize, Serialize};

/// One page of a full-text property search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub filters: MapFilters,
    pub limit: u32,
    pub offset: u32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: MapFilters::default(),
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }

    pub fn with_filters(mut self, filters: MapFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Page size is clamped to `1..=MAX_SEARCH_LIMIT`
    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        self.offset = offset;
        self
    }

    pub fn next_page(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            ..self.clone()
        }
    }
}

/// A ranked row returned by `search_properties_fts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub listing_type: ListingType,
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub colonia: Option<String>,
    #[serde(default)]
    pub rank: Option<f64>,
    /// Window count repeated on every row by the procedure
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total_count: u64,
    pub has_more: bool,
}

impl SearchPage {
    pub fn from_hits(hits: Vec<SearchHit>, query: &SearchQuery) -> Self {
        let seen = query.offset as u64 + hits.len() as u64;
        let total_count = hits
            .first()
            .and_then(|hit| hit.total_count)
            .unwrap_or(seen)
            .max(seen);
        let has_more = if hits.first().and_then(|h| h.total_count).is_some() {
            seen < total_count
        } else {
            hits.len() as u32 >= query.limit
        };
        Self {
            hits,
            total_count,
            has_more,
        }
    }
}
