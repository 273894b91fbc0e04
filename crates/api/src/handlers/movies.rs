//! Movie (Radarr-like) surface: lookup, add, update, list, get.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gatherarr_core::domain::ContentKind;
use gatherarr_core::error::CoreError;
use gatherarr_core::models::{Content, ContentFilter, ContentStatus, ContentType};
use gatherarr_core::services::acquisition::AcquisitionRequest;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedJson;
use crate::models::{
    force_unmonitored_if_wanted, movie_resource, new_movie_content, quality_profile_name,
    CreateMovieRequest, LookupQuery, MovieResource, PaginationQuery, UpdateMovieRequest,
};
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn list_movies(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<Vec<MovieResource>>> {
    let (limit, offset) = pagination.limit_offset();
    let filter = ContentFilter {
        content_type: Some(ContentType::Movie),
        limit,
        offset,
        ..Default::default()
    };
    let (rows, _total) = state.content_repo.list(&filter).await?;
    Ok(Json(rows.iter().map(|c| to_resource(&state, c)).collect()))
}

#[instrument(skip(state))]
pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MovieResource>> {
    let content = state.content_repo.get(id).await?;
    Ok(Json(to_resource(&state, &content)))
}

/// `term` format: `"movie:{externalMovieId}"`; anything else, or an id that
/// fails to parse, returns an empty list.
#[instrument(skip(state))]
pub async fn lookup_movie(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<Vec<MovieResource>>> {
    let Some(external_id) = parse_term(&query.term, "movie") else {
        return Ok(Json(Vec::new()));
    };

    match state.content_repo.find_by_external_movie_id(external_id).await? {
        Some(content) => {
            let mut resource = to_resource(&state, &content);
            force_unmonitored_if_wanted(content.status, &mut resource.monitored);
            Ok(Json(vec![resource]))
        }
        None => {
            let mut resource = MovieResource {
                id: None,
                external_movie_id: external_id,
                ..Default::default()
            };
            if let Some(record) = state.metadata.lookup_movie(external_id).await? {
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
pub async fn create_movie(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateMovieRequest>,
) -> ApiResult<(StatusCode, Json<MovieResource>)> {
    let quality_profile = quality_profile_name(&state.config, request.quality_profile_id);
    let content = new_movie_content(&request, quality_profile)?;
    let created = state.content_repo.add(&content).await?;

    if request.add_options.as_ref().is_some_and(|o| o.search_for_movie) {
        spawn_movie_search(&state, &created);
    }

    info!(content_id = %created.id, "created movie");
    Ok((StatusCode::CREATED, Json(to_resource(&state, &created))))
}

#[instrument(skip(state, request))]
pub async fn update_movie(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateMovieRequest>,
) -> ApiResult<Json<MovieResource>> {
    let mut content = state.content_repo.get(request.id).await?;
    if content.content_type != ContentType::Movie {
        return Err(ApiError::Core(CoreError::NotFound {
            resource: "movie".to_string(),
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

    if request.add_options.as_ref().is_some_and(|o| o.search_for_movie) {
        spawn_movie_search(&state, &updated);
    }

    Ok(Json(to_resource(&state, &updated)))
}

fn to_resource(state: &AppState, content: &Content) -> MovieResource {
    let quality_profile_id = state.config.quality_profile_id(&content.quality_profile).unwrap_or(0);
    movie_resource(content, quality_profile_id)
}

fn spawn_movie_search(state: &AppState, content: &Content) {
    state.acquisition.run(
        AcquisitionRequest {
            content_id: content.id,
            title: content.title.clone(),
            year: content.year,
            quality_profile: content.quality_profile.clone(),
            kind: ContentKind::Movie,
            monitored_seasons: Vec::new(),
        },
        state.task_tracker.clone(),
    );
}

/// Parses `"{prefix}:{id}"`; `None` on any mismatch or non-numeric id.
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
    fn parses_well_formed_term() {
        assert_eq!(parse_term("movie:533535", "movie"), Some(533535));
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert_eq!(parse_term("series:71470", "movie"), None);
    }

    #[test]
    fn rejects_non_numeric_id() {
        assert_eq!(parse_term("movie:abc", "movie"), None);
    }
}
