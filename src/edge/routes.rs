use crate::edge::error::EdgeError;
use crate::edge::state::EdgeState;
use crate::rpc::bump::BumpOutcome;
use crate::rpc::client::MarketplaceClient;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Builds the endpoint router
pub fn router(state: EdgeState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/public-config", get(public_config))
        .route("/bump-property", post(bump_property))
        .route("/cleanup-tile-cache", post(cleanup_tile_cache))
        .route("/refresh-properties-monthly", post(refresh_properties_monthly))
        .route("/refresh-stats-views", post(refresh_stats_views))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(cors))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Settings safe to ship to browsers
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub mapbox_token: Option<String>,
}

async fn public_config(State(state): State<EdgeState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        supabase_url: state.config.url.clone(),
        supabase_anon_key: state.config.anon_key.clone(),
        mapbox_token: state.config.map_token.clone(),
    })
}

#[derive(Debug, Deserialize)]
struct BumpRequest {
    #[serde(alias = "propertyId")]
    property_id: Option<String>,
}

async fn bump_property(
    State(state): State<EdgeState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| EdgeError::Unauthorized("missing authorization header".to_string()))?;

    let request: BumpRequest = serde_json::from_slice(&body)
        .map_err(|e| EdgeError::BadRequest(format!("invalid request body: {}", e)))?;
    let property_id = request
        .property_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EdgeError::BadRequest("property_id is required".to_string()))?;

    let outcome = state
        .client
        .with_bearer(token)
        .bump_property(&property_id)
        .await?;

    let status = match outcome {
        BumpOutcome::Bumped { .. } => StatusCode::OK,
        BumpOutcome::Rejected { .. } => StatusCode::BAD_REQUEST,
    };
    Ok((status, Json(outcome.to_json())).into_response())
}

#[derive(Debug, Clone, Copy)]
enum MaintenanceTask {
    CleanupTileCache,
    RefreshPropertiesMonthly,
    RefreshStatsViews,
}

impl MaintenanceTask {
    fn name(self) -> &'static str {
        match self {
            Self::CleanupTileCache => "cleanup-tile-cache",
            Self::RefreshPropertiesMonthly => "refresh-properties-monthly",
            Self::RefreshStatsViews => "refresh-stats-views",
        }
    }

    async fn run(self, client: &MarketplaceClient) -> crate::Result<Value> {
        match self {
            Self::CleanupTileCache => client.cleanup_tile_cache().await,
            Self::RefreshPropertiesMonthly => client.refresh_properties_monthly().await,
            Self::RefreshStatsViews => client.refresh_stats_views().await,
        }
    }
}

async fn run_maintenance(
    state: &EdgeState,
    headers: &HeaderMap,
    task: MaintenanceTask,
) -> Result<Json<Value>, EdgeError> {
    let authorized = bearer_token(headers)
        .map(|token| state.is_maintenance_token(token))
        .unwrap_or(false);
    if !authorized {
        log::warn!("rejected unauthenticated {} call", task.name());
        return Err(EdgeError::Unauthorized("invalid maintenance token".to_string()));
    }

    let client = state.service_client.as_ref().ok_or_else(|| {
        EdgeError::Internal("service role key is not configured".to_string())
    })?;

    let result = task.run(client).await?;
    log::info!("{} completed", task.name());
    Ok(Json(json!({
        "success": true,
        "task": task.name(),
        "result": result,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn cleanup_tile_cache(
    State(state): State<EdgeState>,
    headers: HeaderMap,
) -> Result<Json<Value>, EdgeError> {
    run_maintenance(&state, &headers, MaintenanceTask::CleanupTileCache).await
}

async fn refresh_properties_monthly(
    State(state): State<EdgeState>,
    headers: HeaderMap,
) -> Result<Json<Value>, EdgeError> {
    run_maintenance(&state, &headers, MaintenanceTask::RefreshPropertiesMonthly).await
}

async fn refresh_stats_views(
    State(state): State<EdgeState>,
    headers: HeaderMap,
) -> Result<Json<Value>, EdgeError> {
    run_maintenance(&state, &headers, MaintenanceTask::RefreshStatsViews).await
}
