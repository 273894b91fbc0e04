//! Facade error mapping.
//!
//! Every user-visible response body is `{"error": "..."}`.
//! `CoreError` variants map onto the status codes §7 names; the two open
//! questions §9 resolves (duplicate -> 500, auth bypass when unconfigured)
//! are applied here, not re-litigated per handler.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatherarr_core::error::CoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("invalid request body: {0}")]
    InvalidJson(String),

    #[error("invalid query or path parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid API key")]
    Unauthorized,

    #[error("service not configured: {0}")]
    NotConfigured(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Core(err) => core_error_status(err),
            ApiError::InvalidJson(_) | ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// §7's kind->status mapping. `Duplicate` collapses to 500 and
/// `InvalidTransition` never reaches the facade as a response at all
/// (reconciler/manager log it, never propagate it to a handler) but is
/// mapped defensively should a caller surface one.
fn core_error_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::InvalidApiKey => StatusCode::UNAUTHORIZED,
        CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
        CoreError::Duplicate { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        CoreError::Constraint { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        CoreError::InvalidTransition { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        CoreError::DownloadNotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::ClientUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        CoreError::ExternalServiceError { .. }
        | CoreError::NetworkError { .. }
        | CoreError::Timeout { .. }
        | CoreError::TemporaryError { .. }
        | CoreError::CircuitBreakerOpen { .. }
        | CoreError::RetryExhausted { .. }
        | CoreError::Database { .. }
        | CoreError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
