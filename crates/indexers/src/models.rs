//! Prowlarr API wire types.
//!
//! These mirror the JSON shape Prowlarr's `/api/v1/search` endpoint
//! actually returns; `prowlarr.rs` translates them into the core's
//! indexer-agnostic `Release`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProwlarrSearchResult {
    pub title: String,

    #[serde(alias = "downloadUrl")]
    pub download_url: String,

    pub guid: String,

    #[serde(alias = "indexerId")]
    pub indexer_id: i32,

    pub indexer: String,

    pub size: Option<i64>,

    pub seeders: Option<i32>,

    pub leechers: Option<i32>,

    #[serde(alias = "publishDate")]
    pub publish_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub categories: Vec<i32>,
}

/// Everything `prowlarr.rs` needs to build a query string; the core's own
/// `domain::capabilities::SearchRequest` is translated into this before the
/// HTTP call is made.
#[derive(Debug, Clone, Default)]
pub struct ProwlarrQuery {
    pub query: String,
    pub categories: Vec<i32>,
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchError {
    pub indexer: String,
    pub message: String,
}
