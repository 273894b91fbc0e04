//! Series (Sonarr-like) surface: lookup, add, update, list, get.
//!
//! Add is the one surface with an explicit dedupe-and-reactivate rule
//! instead of a plain insert: a second POST for
//! an `externalSeriesId` already in the catalog never creates a duplicate
//! row, and can flip a non-`wanted` row back to `wanted` in place.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gatherarr_core::domain::ContentKind;
use gatherarr_core::error::CoreError;
use gatherarr_core::models::{Content, ContentFilter, ContentStatus, ContentType};
use gatherarr_core::services::acquisition::AcquisitionRequest;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedJson;
use crate::models::{
    force_unmonitored_if_wanted, new_series_content, quality_profile_name, series_resource,
    CreateSeriesRequest, LookupQuery, PaginationQuery, SeriesResource, UpdateSeriesRequest,
};
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn list_series(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<Vec<SeriesResource>>> {
    let (limit, offset) = pagination.limit_offset();
    let filter = ContentFilter {
        content_type: Some(ContentType::Series),
        limit,
        offset,
        ..Default::default()
    };
    let (rows, _total) = state.content_repo.list(&filter).await?;
    let mut resources = Vec::with_capacity(rows.len());
    for content in &rows {
        resources.push(to_resource(&state, content).await?);
    }
    Ok(Json(resources))
}

#[instrument(skip(state))]
pub async fn get_series(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SeriesResource>> {
    let content = state.content_repo.get(id).await?;
    Ok(Json(to_resource(&state, &content).await?))
}

#[instrument(skip(state))]
pub async fn lookup_series(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<Vec<SeriesResource>>> {
    let Some(external_id) = parse_term(&query.term, "series") else {
        return Ok(Json(Vec::new()));
    };

    match state.content_repo.find_by_external_series_id(external_id).await? {
        Some(content) => {
            let mut resource = to_resource(&state, &content).await?;
            force_unmonitored_if_wanted(content.status, &mut resource.monitored);
            Ok(Json(vec![resource]))
        }
        None => {
            let mut resource = SeriesResource {
                id: None,
                external_series_id: external_id,
                ..Default::default()
            };
            if let Some(record) = state.metadata.lookup_series(external_id).await? {
                resource.title = record.title;
                resource.year = record.year;
                if let Some(url) = record.poster_url {
                    resource.images.push(crate::models::ImageResource {
                        cover_type: "poster".to_string(),
                        url,
                    });
                }
            }
            Ok(Json(vec![resource]))
        }
    }
}

#[instrument(skip(state, request))]
pub async fn create_series(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSeriesRequest>,
) -> ApiResult<(StatusCode, Json<SeriesResource>)> {
    if let Some(mut existing) = state
        .content_repo
        .find_by_external_series_id(request.external_series_id)
        .await?
    {
        if request.monitored && existing.status != ContentStatus::Wanted {
            existing.status = ContentStatus::Wanted;
            existing.touch();
            existing = state.content_repo.update(&existing).await?;
        }
        maybe_search_series(&state, &existing, &request.seasons, request.add_options.as_ref());
        return Ok((StatusCode::OK, Json(to_resource(&state, &existing).await?)));
    }

    let quality_profile = quality_profile_name(&state.config, request.quality_profile_id);
    let content = new_series_content(&request, quality_profile)?;
    let created = state.content_repo.add(&content).await?;

    maybe_search_series(&state, &created, &request.seasons, request.add_options.as_ref());

    Ok((StatusCode::CREATED, Json(to_resource(&state, &created).await?)))
}

#[instrument(skip(state, request))]
pub async fn update_series(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateSeriesRequest>,
) -> ApiResult<Json<SeriesResource>> {
    let mut content = state.content_repo.get(request.id).await?;
    if content.content_type != ContentType::Series {
        return Err(ApiError::Core(CoreError::NotFound {
            resource: "series".to_string(),
        }));
    }

    content.title = request.title.clone();
    content.year = request.year;
    content.root_path = request.root_folder_path.clone();
    content.quality_profile = quality_profile_name(&state.config, request.quality_profile_id);
    if request.monitored && content.status == ContentStatus::Unmonitored {
        content.status = ContentStatus::Wanted;
    } else if !request.monitored {
        content.status = ContentStatus::Unmonitored;
    }
    content.touch();

    let updated = state.content_repo.update(&content).await?;

    maybe_search_series(&state, &updated, &request.seasons, request.add_options.as_ref());

    Ok(Json(to_resource(&state, &updated).await?))
}

async fn to_resource(state: &AppState, content: &Content) -> ApiResult<SeriesResource> {
    let quality_profile_id = state.config.quality_profile_id(&content.quality_profile).unwrap_or(0);
    let stats = state.episode_repo.get_series_stats(content.id).await.ok();
    Ok(series_resource(content, quality_profile_id, stats))
}

/// Spawns one search per monitored season named in the request's `seasons`
/// list (empty => the pipeline's own "default to season 1" rule applies),
/// only when the search-trigger flag was set.
fn maybe_search_series(
    state: &AppState,
    content: &Content,
    seasons: &[crate::models::SeasonResource],
    add_options: Option<&crate::models::AddSeriesOptions>,
) {
    if !add_options.is_some_and(|o| o.search_for_missing_episodes) {
        return;
    }
    let monitored_seasons: Vec<i32> = seasons
        .iter()
        .filter(|s| s.monitored)
        .map(|s| s.season_number)
        .collect();

    state.acquisition.run(
        AcquisitionRequest {
            content_id: content.id,
            title: content.title.clone(),
            year: content.year,
            quality_profile: content.quality_profile.clone(),
            kind: ContentKind::Series,
            monitored_seasons,
        },
        state.task_tracker.clone(),
    );
}

fn parse_term(term: &str, expected_prefix: &str) -> Option<i32> {
    let (prefix, id) = term.split_once(':')?;
    if prefix != expected_prefix {
        return None;
    }
    let id: i32 = id.parse().ok()?;
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_series_term() {
        assert_eq!(parse_term("series:71470", "series"), Some(71470));
    }

    #[test]
    fn rejects_movie_prefixed_term() {
        assert_eq!(parse_term("movie:533535", "series"), None);
    }
}
