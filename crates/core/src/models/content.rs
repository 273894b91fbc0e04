//! Content: the canonical unit of what the user wants — a movie or series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "content_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    Series,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "content_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Wanted,
    Available,
    Unmonitored,
}

/// The catalog's canonical content record. One row models either a movie or
/// a series; exactly one of `external_movie_id`/`external_series_id` is
/// meaningful, selected by `content_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub content_type: ContentType,
    pub external_movie_id: Option<i32>,
    pub external_series_id: Option<i32>,
    pub title: String,
    pub year: Option<i32>,
    pub status: ContentStatus,
    pub quality_profile: String,
    pub root_path: String,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    pub fn new_movie(
        external_movie_id: i32,
        title: impl Into<String>,
        year: Option<i32>,
        quality_profile: impl Into<String>,
        root_path: impl Into<String>,
    ) -> Result<Self> {
        let root_path = root_path.into();
        validate_root_path(&root_path)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            content_type: ContentType::Movie,
            external_movie_id: Some(external_movie_id),
            external_series_id: None,
            title: title.into(),
            year,
            status: ContentStatus::Wanted,
            quality_profile: quality_profile.into(),
            root_path,
            added_at: now,
            updated_at: now,
        })
    }

    pub fn new_series(
        external_series_id: i32,
        title: impl Into<String>,
        year: Option<i32>,
        quality_profile: impl Into<String>,
        root_path: impl Into<String>,
    ) -> Result<Self> {
        let root_path = root_path.into();
        validate_root_path(&root_path)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            content_type: ContentType::Series,
            external_movie_id: None,
            external_series_id: Some(external_series_id),
            title: title.into(),
            year,
            status: ContentStatus::Wanted,
            quality_profile: quality_profile.into(),
            root_path,
            added_at: now,
            updated_at: now,
        })
    }

    /// The external id relevant for this content's type, used as the
    /// idempotency key by the catalog store.
    pub fn external_id(&self) -> Option<i32> {
        match self.content_type {
            ContentType::Movie => self.external_movie_id,
            ContentType::Series => self.external_series_id,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// External-facade derivation: `monitored = status in {wanted, available}`.
    pub fn monitored(&self) -> bool {
        matches!(self.status, ContentStatus::Wanted | ContentStatus::Available)
    }

    /// External-facade derivation: `hasFile = status == available`.
    pub fn has_file(&self) -> bool {
        self.status == ContentStatus::Available
    }
}

fn validate_root_path(root_path: &str) -> Result<()> {
    if root_path.trim().is_empty() {
        return Err(CoreError::Validation {
            field: "rootPath".to_string(),
            message: "root path must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Filters accepted by `ContentRepository::list`.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub content_type: Option<ContentType>,
    pub status: Option<ContentStatus>,
    pub quality_profile: Option<String>,
    pub external_movie_id: Option<i32>,
    pub external_series_id: Option<i32>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub limit: i64,
    pub offset: i64,
}

impl ContentFilter {
    pub fn paginated(limit: i64, offset: i64) -> Self {
        Self {
            limit,
            offset,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_movie_is_wanted_and_monitored() {
        let content =
            Content::new_movie(533535, "Deadpool & Wolverine", Some(2024), "HD-1080p", "/movies")
                .unwrap();
        assert_eq!(content.status, ContentStatus::Wanted);
        assert!(content.monitored());
        assert!(!content.has_file());
        assert_eq!(content.external_id(), Some(533535));
    }

    #[test]
    fn empty_root_path_is_rejected() {
        let result = Content::new_movie(1, "x", None, "HD-1080p", "   ");
        assert!(result.is_err());
    }
}
