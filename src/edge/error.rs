use crate::MapError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of an endpoint, rendered as `{"success": false, "error": ...}`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EdgeError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl EdgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EdgeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EdgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MapError> for EdgeError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::Validation(msg) => EdgeError::BadRequest(msg),
            MapError::Unauthorized(msg) => EdgeError::Unauthorized(msg),
            other => {
                log::error!("backend call failed: {}", other);
                EdgeError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_status_mapping() {
        assert_eq!(
            EdgeError::from(MapError::Validation("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EdgeError::from(MapError::Unauthorized("rls".into())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            EdgeError::from(MapError::Network("reset".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
