//! Route mounting: `/api/v3` for both impersonated surfaces, an
//! unprefixed `/health` ambient probe, and the auth/CORS/logging layers
//! wrapped around the whole mux.

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, introspection, movies, queue, series};
use crate::middleware::{request_logger, require_api_key};
use crate::security::{configure_cors, security_headers, SecurityConfig};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let security_config = SecurityConfig::from_env();

    let movie_routes = Router::new()
        .route(
            "/movie",
            get(movies::list_movies)
                .post(movies::create_movie)
                .put(movies::update_movie),
        )
        .route("/movie/lookup", get(movies::lookup_movie))
        .route("/movie/:id", get(movies::get_movie));

    let series_routes = Router::new()
        .route(
            "/series",
            get(series::list_series)
                .post(series::create_series)
                .put(series::update_series),
        )
        .route("/series/lookup", get(series::lookup_series))
        .route("/series/:id", get(series::get_series));

    let introspection_routes = Router::new()
        .route("/rootfolder", get(introspection::list_root_folders))
        .route("/qualityprofile", get(introspection::list_quality_profiles))
        .route("/qualityProfile", get(introspection::list_quality_profiles))
        .route("/languageprofile", get(introspection::list_language_profiles))
        .route(
            "/tag",
            get(introspection::list_tags).post(introspection::create_tag),
        )
        .route("/command", post(introspection::run_command))
        .route("/system/status", get(introspection::system_status));

    let queue_routes = Router::new().route("/queue", get(queue::get_queue));

    let api_v3 = Router::new()
        .merge(movie_routes)
        .merge(series_routes)
        .merge(introspection_routes)
        .merge(queue_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v3", api_v3)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(request_logger))
                .layer(configure_cors(&security_config)),
        );

    for header_layer in security_headers() {
        router = router.layer(header_layer);
    }

    router.with_state(state)
}
