//! External wire schemas (the "Radarr-like"/"Sonarr-like" shapes) and
//! their translation to/from `gatherarr_core::models::Content`.
//!
//! These are deliberately separate types from the internal `Content`
//! model: the facade translates explicitly at the boundary rather than
//! serializing internal rows directly, the same "external schema != internal
//! model" idiom the pack's qBittorrent compatibility facade uses.

use chrono::{DateTime, Utc};
use gatherarr_core::models::{Content, ContentStatus, ContentType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImageResource {
    pub cover_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMovieOptions {
    #[serde(default)]
    pub search_for_movie: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSeriesOptions {
    #[serde(default)]
    pub search_for_missing_episodes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeasonResource {
    pub season_number: i32,
    pub monitored: bool,
}

/// The Radarr-like movie wire resource. The id key matches the upstream
/// frontend's own fixtures (`externalMovieId`, not `tmdbId`) — scenario 1's
/// POST body names it that way.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MovieResource {
    /// Absent entirely (not `null`) for an untracked lookup hit — the
    /// signal the frontend uses to decide whether to POST.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub external_movie_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub quality_profile_id: i32,
    pub root_folder_path: String,
    pub monitored: bool,
    pub has_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Vec<ImageResource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    pub external_movie_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub quality_profile_id: i32,
    pub root_folder_path: String,
    #[serde(default)]
    pub monitored: bool,
    pub add_options: Option<AddMovieOptions>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieRequest {
    pub id: Uuid,
    pub external_movie_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub quality_profile_id: i32,
    pub root_folder_path: String,
    pub monitored: bool,
    pub add_options: Option<AddMovieOptions>,
}

/// The Sonarr-like series wire resource. `externalSeriesId` for the same
/// reason `MovieResource` uses `externalMovieId`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub external_series_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub quality_profile_id: i32,
    pub root_folder_path: String,
    pub monitored: bool,
    pub season_count: i64,
    pub episode_count: i64,
    pub episode_file_count: i64,
    #[serde(default)]
    pub seasons: Vec<SeasonResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Vec<ImageResource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeriesRequest {
    pub external_series_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub quality_profile_id: i32,
    pub root_folder_path: String,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub seasons: Vec<SeasonResource>,
    pub add_options: Option<AddSeriesOptions>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSeriesRequest {
    pub id: Uuid,
    pub external_series_id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub quality_profile_id: i32,
    pub root_folder_path: String,
    pub monitored: bool,
    #[serde(default)]
    pub seasons: Vec<SeasonResource>,
    pub add_options: Option<AddSeriesOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupQuery {
    pub term: String,
}

/// `qualityProfileId` -> stored profile name, via the config's
/// authoritative map; an unrecognized id falls back to the empty string
/// so a handler can still construct a resource rather than fail the
/// whole request.
pub fn quality_profile_name(config: &gatherarr_core::config::Config, id: i32) -> String {
    config
        .quality_profile_name(id)
        .map(str::to_string)
        .unwrap_or_default()
}

pub fn movie_resource(content: &Content, quality_profile_id: i32) -> MovieResource {
    MovieResource {
        id: Some(content.id),
        external_movie_id: content.external_movie_id.unwrap_or_default(),
        title: content.title.clone(),
        year: content.year,
        quality_profile_id,
        root_folder_path: content.root_path.clone(),
        monitored: content.monitored(),
        has_file: content.has_file(),
        added: Some(content.added_at),
        images: Vec::new(),
    }
}

pub fn series_resource(
    content: &Content,
    quality_profile_id: i32,
    stats: Option<gatherarr_core::models::SeriesStats>,
) -> SeriesResource {
    let (season_count, episode_count, episode_file_count) = stats
        .map(|s| (s.season_count, s.total_episodes, s.available_episodes))
        .unwrap_or((0, 0, 0));
    SeriesResource {
        id: Some(content.id),
        external_series_id: content.external_series_id.unwrap_or_default(),
        title: content.title.clone(),
        year: content.year,
        quality_profile_id,
        root_folder_path: content.root_path.clone(),
        monitored: content.monitored(),
        season_count,
        episode_count,
        episode_file_count,
        seasons: Vec::new(),
        added: Some(content.added_at),
        images: Vec::new(),
    }
}

pub fn new_movie_content(
    req: &CreateMovieRequest,
    quality_profile: String,
) -> gatherarr_core::error::Result<Content> {
    Content::new_movie(
        req.external_movie_id,
        req.title.clone(),
        req.year,
        quality_profile,
        req.root_folder_path.clone(),
    )
}

pub fn new_series_content(
    req: &CreateSeriesRequest,
    quality_profile: String,
) -> gatherarr_core::error::Result<Content> {
    Content::new_series(
        req.external_series_id,
        req.title.clone(),
        req.year,
        quality_profile,
        req.root_folder_path.clone(),
    )
}

/// Forces the lookup-hit-but-unconverted-yet quirk: a row the catalog
/// already has in `wanted` status is returned with `monitored` forced to
/// `false`, which is how the facade induces the frontend to PUT
/// `monitored=true` and thereby re-trigger a search.
pub fn force_unmonitored_if_wanted(status: ContentStatus, resource_monitored: &mut bool) {
    if status == ContentStatus::Wanted {
        *resource_monitored = false;
    }
}

pub fn content_type_matches(content_type: ContentType, expected: ContentType) -> bool {
    content_type == expected
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResource {
    pub id: Uuid,
    pub download_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<Uuid>,
    pub title: String,
    pub status: String,
    pub size: i64,
    pub sizeleft: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeleft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<String>,
    pub indexer: String,
    pub download_client: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub page: i64,
    pub page_size: i64,
    pub total_records: i64,
    pub records: Vec<QueueResource>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootFolderResource {
    pub id: i32,
    pub path: String,
    pub accessible: bool,
    pub free_space: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfileResource {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResource {
    pub id: i32,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagRequest {
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProfileResource {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub name: String,
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResource {
    pub id: Uuid,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatusResource {
    pub version: String,
    pub app_name: String,
    pub start_time: DateTime<Utc>,
    pub authentication: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PaginationQuery {
    pub fn limit_offset(&self) -> (i64, i64) {
        let page_size = self.page_size().max(1);
        let page = self.page().max(1);
        (page_size, (page - 1) * page_size)
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(50).clamp(1, 1000)
    }
}
