//! PostgreSQL catalog store implementation.
//!
//! Provides the concrete repository implementations for the traits
//! `gatherarr-core` defines, plus connection pooling and
//! migration running.

pub mod database;
pub mod error;
pub mod repositories;

pub use database::{create_pool, migrate, test_connection, DatabaseConfig, DatabasePool};
pub use error::InfrastructureError;
