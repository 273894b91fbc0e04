//! Auth and request-logging middleware.
//!
//! The query parameter `apikey` is an equally valid credential alongside
//! the `X-Api-Key` header; when the server has no configured key at all,
//! authentication is bypassed entirely.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::AppState;

pub async fn request_logger(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    tracing::info!("{} {} -> {}", method, uri, response.status());
    response
}

/// Requires `X-Api-Key` or `?apikey=` to match the configured key.
/// Unconfigured key => bypassed entirely.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(request).await;
    };

    let header_key = request
        .headers()
        .get("X-Api-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let query_key = request
        .uri()
        .query()
        .and_then(|q| serde_urlencoded::from_str::<std::collections::HashMap<String, String>>(q).ok())
        .and_then(|params| params.get("apikey").cloned());

    let presented = header_key.or(query_key);

    match presented {
        Some(key) if key == expected => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid API key" })),
        )
            .into_response(),
    }
}
