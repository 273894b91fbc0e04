//! Root folders, quality/language profiles, tags, commands, and system
//! status: the static and near-static introspection surface both the
//! movie and series frontends poll on load.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::models::{
    CommandRequest, CommandResource, CreateTagRequest, LanguageProfileResource,
    QualityProfileResource, RootFolderResource, SystemStatusResource, TagResource,
};
use crate::state::AppState;

pub async fn list_root_folders(State(state): State<AppState>) -> Json<Vec<RootFolderResource>> {
    Json(vec![
        RootFolderResource {
            id: 1,
            path: state.config.movie_root.clone(),
            accessible: true,
            free_space: 0,
        },
        RootFolderResource {
            id: 2,
            path: state.config.series_root.clone(),
            accessible: true,
            free_space: 0,
        },
    ])
}

pub async fn list_quality_profiles(
    State(state): State<AppState>,
) -> Json<Vec<QualityProfileResource>> {
    let mut profiles: Vec<QualityProfileResource> = state
        .config
        .quality_profiles
        .iter()
        .map(|(name, id)| QualityProfileResource {
            id: *id,
            name: name.clone(),
        })
        .collect();
    profiles.sort_by_key(|p| p.id);
    Json(profiles)
}

pub async fn list_language_profiles() -> Json<Vec<LanguageProfileResource>> {
    Json(vec![LanguageProfileResource {
        id: 1,
        name: "English".to_string(),
    }])
}

pub async fn list_tags(State(state): State<AppState>) -> Json<Vec<TagResource>> {
    Json(state.tags.list())
}

pub async fn create_tag(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateTagRequest>,
) -> (StatusCode, Json<TagResource>) {
    let tag = state.tags.create(request.label);
    (StatusCode::CREATED, Json(tag))
}

/// Acknowledges without dispatching: no command name is mapped to an
/// internal action, and none is triggered here.
pub async fn run_command(
    ValidatedJson(request): ValidatedJson<CommandRequest>,
) -> (StatusCode, Json<CommandResource>) {
    (
        StatusCode::CREATED,
        Json(CommandResource {
            id: Uuid::new_v4(),
            name: request.name,
            status: "queued".to_string(),
        }),
    )
}

pub async fn system_status(State(state): State<AppState>) -> ApiResult<Json<SystemStatusResource>> {
    Ok(Json(SystemStatusResource {
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_name: "gatherarr".to_string(),
        start_time: state.started_at,
        authentication: if state.config.api_key.is_some() {
            "apikey".to_string()
        } else {
            "none".to_string()
        },
    }))
}
