//! The Radarr-like/Sonarr-like compatibility facade: a translation layer
//! over the catalog store, never a state owner of its own.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use security::{configure_cors, security_headers, SecurityConfig};
pub use state::{AppState, TagStore};
