//! Group API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{error, json_body, success, ApiResponse, ApiResult, Keyed};
use crate::domain::validate_group_input;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{Group, NewGroup};
use crate::AppState;

/// GET /api/groups - List all groups, newest first.
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Vec<Group>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_groups().await {
        Ok(groups) => Ok(ApiResponse::list(groups, revision_id)),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/groups/user/:userId - Groups the user is a member of.
pub async fn list_user_groups(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<Group>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if user_id <= 0 {
        return error(AppError::BadRequest("Invalid user ID".to_string()), revision_id);
    }

    tracing::info!(user_id, "Fetching groups for user");
    match state.repo.list_user_groups(user_id).await {
        Ok(groups) => Ok(ApiResponse::list(groups, revision_id)),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/groups/:id - Get a single group with members and sessions.
pub async fn get_group(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Group> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_group(id).await {
        Ok(Some(group)) => success(group, revision_id),
        Ok(None) => error(AppError::NotFound("Group not found".to_string()), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/groups - Create a group with the acting user as admin.
pub async fn create_group(
    State(state): State<AppState>,
    payload: Result<Json<NewGroup>, JsonRejection>,
) -> Result<Keyed<Group>, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let request = json_body(payload, revision_id)?.sanitized();

    validate_group_input(
        &request.name,
        request.description.as_deref(),
        Some(&request.color_theme),
    )
    .map_err(|e| AppError::from(e).with_revision(revision_id))?;

    tracing::info!(name = %request.name, "Creating group");
    let group = state
        .repo
        .create_group(&request, Some(state.config.acting_user_id))
        .await
        .map_err(|e| e.with_revision(revision_id))?;

    tracing::info!(group_id = group.id, "Group created");
    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    Ok(Keyed::created("group", group, new_revision).with_message("Group created successfully"))
}

/// DELETE /api/groups/:id - Delete a group and everything in it.
pub async fn delete_group(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_group(id).await {
        Ok(()) => {
            tracing::info!(group_id = id, "Group deleted");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            Ok(ApiResponse::new((), new_revision).with_message("Group deleted successfully"))
        }
        Err(e) => error(e, revision_id),
    }
}
