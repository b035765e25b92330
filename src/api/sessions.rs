//! Voting session API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;

use super::{error, json_body, ApiResponse, ApiResult, Keyed};
use crate::domain::validate_session_input;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{LockRequest, NewSession, Proposal, VotingSession};
use crate::AppState;

/// GET /api/sessions/group/:groupId - Sessions of a group, newest first.
///
/// Answers with a bare array.
pub async fn list_group_sessions(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<VotingSession>>, AppErrorWithRevision> {
    let sessions = state
        .repo
        .list_group_sessions(group_id, true)
        .await
        .map_err(|e| e.with_revision(0))?;

    Ok(Json(sessions))
}

/// GET /api/sessions/:id - A bare session with options and group summary.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VotingSession>, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_session(id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err(AppError::NotFound("Session not found".to_string()).with_revision(revision_id)),
        Err(e) => Err(e.with_revision(revision_id)),
    }
}

/// POST /api/sessions - Open a new voting session in a group.
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<NewSession>, JsonRejection>,
) -> Result<Keyed<VotingSession>, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let request = json_body(payload, revision_id)?;

    // Deadlines are not re-checked here: the server clock decides expiry.
    validate_session_input(&request.title, request.group_id, None, Utc::now())
        .map_err(|e| AppError::from(e).with_revision(revision_id))?;

    let session = state
        .repo
        .create_session(&request)
        .await
        .map_err(|e| e.with_revision(revision_id))?;

    tracing::info!(session_id = session.id, group_id = session.group_id, "Session created");
    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    Ok(Keyed::created("session", session, new_revision))
}

/// POST /api/sessions/:id/lock - Lock or unlock a session.
pub async fn lock_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<LockRequest>, JsonRejection>,
) -> Result<Keyed<VotingSession>, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let request = json_body(payload, revision_id)?;

    let Some(locked) = request.locked else {
        return Err(AppError::BadRequest("Field 'locked' is required".to_string())
            .with_revision(revision_id));
    };

    let session = state
        .repo
        .set_session_locked(id, locked)
        .await
        .map_err(|e| e.with_revision(revision_id))?;

    tracing::info!(session_id = id, locked, "Session lock changed");
    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    Ok(Keyed::ok("session", session, new_revision))
}

/// GET /api/sessions/:id/options - Options ordered by votes.
pub async fn list_session_options(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> ApiResult<Vec<Proposal>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.session_exists(session_id).await {
        Ok(true) => {}
        Ok(false) => return error(AppError::NotFound("Session not found".to_string()), revision_id),
        Err(e) => return error(e, revision_id),
    }

    match state.repo.list_session_options(session_id).await {
        Ok(options) => Ok(ApiResponse::list(options, revision_id)),
        Err(e) => error(e, revision_id),
    }
}
