//! Core domain models and business logic.
//!
//! The catalog store's entities and repository traits, the download
//! lifecycle state machine, the event bus and audit log, and the
//! acquisition pipeline that ties search to grab. Everything here is
//! storage- and transport-agnostic: `gatherarr-infrastructure` implements
//! the repository traits, `gatherarr-indexers`/`gatherarr-downloaders`
//! implement the capability traits, and `gatherarr-api` is the only
//! crate that talks HTTP.

pub mod circuit_breaker;
pub mod config;
pub mod correlation;
pub mod domain;
pub mod error;
pub mod events;
pub mod models;
pub mod retry;
pub mod services;

pub use config::Config;
pub use domain::*;
pub use error::*;
pub use events::*;
pub use models::*;
pub use services::*;
// Selective re-exports to avoid naming conflicts.
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerMetrics};
pub use retry::{retry_with_backoff, RetryConfig, RetryPolicy};
