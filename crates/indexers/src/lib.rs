//! Release-indexer search capability.
//!
//! `gatherarr-core` depends only on the `Search` trait; this
//! crate provides the Prowlarr-backed implementation.

pub mod models;
pub mod prowlarr;

pub use prowlarr::{ProwlarrClient, ProwlarrConfig};

/// Create a Prowlarr client from environment variables.
pub fn client_from_env() -> gatherarr_core::error::Result<ProwlarrClient> {
    prowlarr::from_env()
}
