#![cfg(feature = "edge")]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use propmap::edge::{router, EdgeState};
use propmap::rpc::{RpcTransport, ScriptedTransport};
use propmap::{BackendConfig, MapError};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Endpoint behaviour driven through the router without a socket
#[cfg(test)]
mod edge_tests {
    use super::*;

    fn config() -> BackendConfig {
        let mut config = BackendConfig::new("https://demo.supabase.co", "anon-key");
        config.service_role_key = Some("service-key".to_string());
        config.cron_secret = Some("cron-secret".to_string());
        config.map_token = Some("pk.map".to_string());
        config
    }

    fn bump_backend() -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::new(|req| {
            match req.params["p_property_id"].as_str() {
                Some("limit-reached") => Ok(json!({
                    "success": false,
                    "error": "Monthly bump limit reached"
                })),
                Some("forbidden") => Err(MapError::Unauthorized("permission denied".into())),
                _ => Ok(json!({
                    "success": true,
                    "bumps_used": 2,
                    "bumps_limit": 5,
                    "bumps_remaining": 3,
                    "next_reset": "2026-11-01T00:00:00Z"
                })),
            }
        }))
    }

    fn state(anon: Arc<ScriptedTransport>, service: Option<Arc<ScriptedTransport>>) -> EdgeState {
        EdgeState::with_transports(
            config(),
            anon,
            service.map(|s| s as Arc<dyn RpcTransport>),
        )
    }

    async fn send(state: EdgeState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn bump_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/bump-property")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_bump_requires_bearer() {
        let backend = bump_backend();
        let (status, body) = send(
            state(backend.clone(), None),
            bump_request(None, r#"{"property_id":"p1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bump_requires_property_id() {
        let backend = bump_backend();
        for payload in [r#"{}"#, r#"{"property_id":"  "}"#, "not json"] {
            let (status, body) = send(
                state(backend.clone(), None),
                bump_request(Some("user-jwt"), payload),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", payload);
            assert_eq!(body["success"], json!(false));
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bump_forwards_caller_token() {
        let backend = bump_backend();
        let (status, body) = send(
            state(backend.clone(), None),
            bump_request(Some("user-jwt"), r#"{"property_id":"p1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["bumps_remaining"], json!(3));

        let calls = backend.calls();
        assert_eq!(calls[0].function, "bump_property");
        assert_eq!(calls[0].bearer.as_deref(), Some("user-jwt"));
    }

    #[tokio::test]
    async fn test_bump_rejections_and_rls_errors() {
        let backend = bump_backend();
        let (status, body) = send(
            state(backend.clone(), None),
            bump_request(Some("user-jwt"), r#"{"property_id":"limit-reached"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Monthly bump limit reached"));

        let (status, _) = send(
            state(backend, None),
            bump_request(Some("user-jwt"), r#"{"property_id":"forbidden"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    fn maintenance_request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::POST).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_maintenance_endpoints_use_service_key() {
        let anon = Arc::new(ScriptedTransport::returning(Value::Null));
        let service = Arc::new(ScriptedTransport::returning(json!({"deleted": 12})));

        for (path, function) in [
            ("/cleanup-tile-cache", "cleanup_tile_cache"),
            ("/refresh-properties-monthly", "refresh_properties_monthly"),
            ("/refresh-stats-views", "refresh_stats_views"),
        ] {
            let (status, body) = send(
                state(anon.clone(), Some(service.clone())),
                maintenance_request(path, Some("cron-secret")),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{}", path);
            assert_eq!(body["success"], json!(true));
            assert_eq!(service.calls_to(function), 1);
        }
        assert_eq!(anon.call_count(), 0);
    }

    #[tokio::test]
    async fn test_maintenance_rejects_bad_tokens() {
        let service = Arc::new(ScriptedTransport::returning(Value::Null));
        for token in [None, Some("anon-key"), Some("wrong")] {
            let (status, _) = send(
                state(bump_backend(), Some(service.clone())),
                maintenance_request("/refresh-stats-views", token),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        assert_eq!(service.call_count(), 0);

        // Authorized, but the service role client is missing
        let (status, body) = send(
            state(bump_backend(), None),
            maintenance_request("/refresh-stats-views", Some("cron-secret")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_public_config_hides_service_key() {
        let request = Request::builder()
            .uri("/public-config")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state(bump_backend(), None), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["supabaseUrl"], json!("https://demo.supabase.co"));
        assert_eq!(body["supabaseAnonKey"], json!("anon-key"));
        assert_eq!(body["mapboxToken"], json!("pk.map"));
        assert!(!body.to_string().contains("service-key"));
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "https://elsewhere.example")
            .body(Body::empty())
            .unwrap();
        let response = router(state(bump_backend(), None))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
