//! Episode: tracked per-episode state for series content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::content::ContentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub content_id: Uuid,
    pub season: i32,
    pub episode: i32,
    pub title: String,
    pub status: ContentStatus,
    pub air_date: Option<DateTime<Utc>>,
}

impl Episode {
    pub fn new(content_id: Uuid, season: i32, episode: i32, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_id,
            season,
            episode,
            title: title.into(),
            status: ContentStatus::Wanted,
            air_date: None,
        }
    }
}

/// Filters accepted by `EpisodeRepository::list`.
#[derive(Debug, Clone, Default)]
pub struct EpisodeFilter {
    pub content_id: Option<Uuid>,
    pub season: Option<i32>,
    pub status: Option<ContentStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl EpisodeFilter {
    pub fn for_content(content_id: Uuid, limit: i64, offset: i64) -> Self {
        Self {
            content_id: Some(content_id),
            limit,
            offset,
            ..Default::default()
        }
    }
}

/// Aggregate per-series counters returned by `get_series_stats[_batch]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesStats {
    pub content_id: Uuid,
    pub total_episodes: i64,
    pub available_episodes: i64,
    pub season_count: i64,
}
