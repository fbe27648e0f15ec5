use crate::core::bounds::MapBounds;
use crate::core::constants::*;
use crate::model::filters::MapFilters;
use crate::model::response::{decode_map_data, DecodedMapData};
use crate::rpc::bump::BumpOutcome;
use crate::rpc::params::{BumpParams, GetMapDataParams, SearchParams};
use crate::rpc::search::{SearchHit, SearchPage, SearchQuery};
use crate::rpc::transport::{RpcRequest, RpcTransport};
use crate::{MapError, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Typed front for the marketplace's stored procedures
#[derive(Clone)]
pub struct MarketplaceClient {
    transport: Arc<dyn RpcTransport>,
    bearer: Option<String>,
}

impl MarketplaceClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            bearer: None,
        }
    }

    /// Same transport, calls made on behalf of the given session token
    pub fn with_bearer(&self, token: impl Into<String>) -> Self {
        Self {
            transport: self.transport.clone(),
            bearer: Some(token.into()),
        }
    }

    async fn call<P: Serialize>(&self, function: &str, params: &P) -> Result<Value> {
        let params = serde_json::to_value(params)?;
        let request = RpcRequest::new(function, params).with_bearer(self.bearer.clone());
        self.transport.call(request).await
    }

    /// One `get_map_data` round trip, schema-checked
    pub async fn get_map_data(
        &self,
        bounds: &MapBounds,
        zoom: i32,
        filters: &MapFilters,
    ) -> Result<DecodedMapData> {
        if !bounds.is_valid() {
            return Err(MapError::Validation(format!(
                "refusing to fetch invalid bounds {:?}",
                bounds
            )));
        }
        let params = GetMapDataParams::new(bounds, zoom, filters);
        let raw = self.call(RPC_GET_MAP_DATA, &params).await?;
        decode_map_data(raw)
    }

    pub async fn search_properties_fts(&self, query: &SearchQuery) -> Result<SearchPage> {
        if query.text.trim().is_empty() {
            return Err(MapError::Validation("search text is empty".to_string()));
        }
        let params = SearchParams::new(&query.text, &query.filters, query.limit, query.offset);
        let raw = self.call(RPC_SEARCH_PROPERTIES_FTS, &params).await?;

        let hits: Vec<SearchHit> = match raw {
            Value::Null => Vec::new(),
            Value::Array(rows) => rows
                .into_iter()
                .filter_map(|row| match serde_json::from_value::<SearchHit>(row) {
                    Ok(hit) => Some(hit),
                    Err(e) => {
                        log::warn!("dropping malformed search row: {}", e);
                        None
                    }
                })
                .collect(),
            other => {
                return Err(MapError::Decode(format!(
                    "search_properties_fts returned a non-array payload: {}",
                    other
                )))
            }
        };

        Ok(SearchPage::from_hits(hits, query))
    }

    pub async fn bump_property(&self, property_id: &str) -> Result<BumpOutcome> {
        let property_id = property_id.trim();
        if property_id.is_empty() {
            return Err(MapError::Validation("property_id is required".to_string()));
        }
        let params = BumpParams {
            p_property_id: property_id.to_string(),
        };
        let raw = self.call(RPC_BUMP_PROPERTY, &params).await?;
        let outcome = BumpOutcome::from_value(&raw)?;
        match &outcome {
            BumpOutcome::Bumped {
                bumps_remaining, ..
            } => log::info!(
                "bumped property {} ({} bumps remaining)",
                property_id,
                bumps_remaining
            ),
            BumpOutcome::Rejected { error } => {
                log::warn!("bump of property {} rejected: {}", property_id, error)
            }
        }
        Ok(outcome)
    }

    pub async fn cleanup_tile_cache(&self) -> Result<Value> {
        self.call(RPC_CLEANUP_TILE_CACHE, &Value::Object(Default::default()))
            .await
    }

    pub async fn refresh_properties_monthly(&self) -> Result<Value> {
        self.call(RPC_REFRESH_PROPERTIES_MONTHLY, &Value::Object(Default::default()))
            .await
    }

    pub async fn refresh_stats_views(&self) -> Result<Value> {
        self.call(RPC_REFRESH_STATS_VIEWS, &Value::Object(Default::default()))
            .await
    }
}
