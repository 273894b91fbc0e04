//! File: a realized media artifact on disk tied to content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: Uuid,
    pub content_id: Uuid,
    pub episode_id: Option<Uuid>,
    pub path: String,
    pub size_bytes: i64,
    pub quality: String,
    pub source: String,
    pub added_at: DateTime<Utc>,
}

impl MediaFile {
    pub fn new(
        content_id: Uuid,
        episode_id: Option<Uuid>,
        path: impl Into<String>,
        size_bytes: i64,
        quality: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_id,
            episode_id,
            path: path.into(),
            size_bytes,
            quality: quality.into(),
            source: source.into(),
            added_at: Utc::now(),
        }
    }
}

/// Filters accepted by `FileRepository::list`. `season` joins through
/// episodes.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub content_id: Option<Uuid>,
    pub episode_id: Option<Uuid>,
    pub season: Option<i32>,
    pub quality: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
