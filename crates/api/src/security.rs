//! CORS and baseline security headers.
//!
//! No browser SPA ships with this facade, so there's no dev-origin
//! allowlist or CSP policy to carry; just what a server-to-server
//! compatibility facade still needs: permissive CORS for the upstream
//! frontend and a small set of standard hardening headers.

use axum::http::{header, HeaderValue, Method};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer};

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        Self { cors_origins }
    }
}

/// Permissive (`Any`) when no origins are configured.
pub fn configure_cors(config: &SecurityConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ]);

    if config.cors_origins.is_empty() {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

pub fn security_headers() -> Vec<SetResponseHeaderLayer<HeaderValue>> {
    vec![
        SetResponseHeaderLayer::overriding(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        ),
    ]
}
