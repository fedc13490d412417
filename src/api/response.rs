//! Response types for the dues engine API.
//!
//! This module defines the success envelopes, the error response structure,
//! and the mapping from [`EngineError`] to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{FailureRecord, LedgerEntry, RemittanceRecord, RunSummary};

/// Response body for the `/runs` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// The run summary.
    pub summary: RunSummary,
    /// Every ledger entry the run wrote, skipped entries included.
    pub entries: Vec<LedgerEntry>,
    /// Per-member failure records.
    pub failures: Vec<FailureRecord>,
}

/// Response body for the `/remittances/aggregate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResponse {
    /// One record per reporting affiliate.
    pub records: Vec<RemittanceRecord>,
    /// Expected affiliates that have not reported.
    pub pending: Vec<String>,
    /// True when every expected affiliate has reported.
    pub complete: bool,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let status = match &error {
            EngineError::RunConflict { .. } | EngineError::IncompleteAggregation { .. } => {
                StatusCode::CONFLICT
            }
            EngineError::Arithmetic { .. }
            | EngineError::InputsUnavailable { .. }
            | EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiErrorResponse {
            status,
            error: ApiError::new(error.kind(), error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_run_conflict_maps_to_conflict_status() {
        let engine_error = EngineError::RunConflict {
            organization_id: "local_456".to_string(),
            period: "2025-03".to_string(),
        };
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::CONFLICT);
        assert_eq!(api_error.error.code, "RUN_CONFLICT");
    }

    #[test]
    fn test_unsafe_formula_maps_to_bad_request() {
        let engine_error = EngineError::UnsafeFormula {
            token: "member".to_string(),
            expression: "member.wages".to_string(),
        };
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error.code, "UNSAFE_FORMULA");
    }

    #[test]
    fn test_config_error_maps_to_internal() {
        let engine_error = EngineError::ConfigNotFound {
            path: "./config/default/engine.yaml".to_string(),
        };
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.error.code, "CONFIG_ERROR");
    }
}
