//! Core domain models
//!
//! The fundamental entities and value objects representing the catalog's
//! four persisted entity kinds (content, episode, file, download) plus the
//! configuration-only quality profile lookup.

pub mod content;
pub mod download;
pub mod episode;
pub mod file;
pub mod quality;

pub use content::*;
pub use download::*;
pub use episode::*;
pub use file::*;
pub use quality::*;
