use crate::{MapError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// Outcome of `bump_property`: either the listing was moved to the top of
/// the results, or the backend refused (quota exhausted, not the owner, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BumpOutcome {
    Bumped {
        bumps_used: u32,
        bumps_limit: u32,
        bumps_remaining: u32,
        next_reset: Option<DateTime<Utc>>,
    },
    Rejected {
        error: String,
    },
}

impl BumpOutcome {
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| MapError::Decode("bump_property result is not an object".to_string()))?;

        let success = object.get("success").and_then(Value::as_bool).unwrap_or(false);
        if !success {
            let error = object
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Ok(Self::Rejected { error });
        }

        let count = |field: &str| {
            object
                .get(field)
                .and_then(Value::as_u64)
                .map(|v| v.min(u32::MAX as u64) as u32)
                .unwrap_or(0)
        };
        let next_reset = object
            .get("next_reset")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let bumps_used = count("bumps_used");
        let bumps_limit = count("bumps_limit");
        let bumps_remaining = object
            .get("bumps_remaining")
            .and_then(Value::as_u64)
            .map(|v| v.min(u32::MAX as u64) as u32)
            .unwrap_or_else(|| bumps_limit.saturating_sub(bumps_used));

        Ok(Self::Bumped {
            bumps_used,
            bumps_limit,
            bumps_remaining,
            next_reset,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Bumped { .. })
    }

    /// Wire shape returned to HTTP callers
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bumped {
                bumps_used,
                bumps_limit,
                bumps_remaining,
                next_reset,
            } => json!({
                "success": true,
                "bumps_used": bumps_used,
                "bumps_limit": bumps_limit,
                "bumps_remaining": bumps_remaining,
                "next_reset": next_reset.map(|dt| dt.to_rfc3339()),
            }),
            Self::Rejected { error } => json!({
                "success": false,
                "error": error,
            }),
        }
    }
}
