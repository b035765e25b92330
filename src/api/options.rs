//! Option (restaurant proposal) API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{json_body, ApiResponse, ApiResult, Keyed};
use crate::domain::{validate_option_input, ValidationErrors};
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{NewProposal, Proposal, VoteRequest};
use crate::AppState;

/// POST /api/options - Propose a restaurant in an open session.
pub async fn add_option(
    State(state): State<AppState>,
    payload: Result<Json<NewProposal>, JsonRejection>,
) -> Result<Keyed<Proposal>, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let request = json_body(payload, revision_id)?;

    let mut fields = validate_option_input(
        &request.name,
        &request.link,
        request.image_url.as_deref(),
        request.price_range.as_deref(),
    )
    .err()
    .unwrap_or_else(ValidationErrors::new);
    if request.voting_session_id <= 0 {
        fields.add("votingSessionId", "Session ID is required");
    }
    if !fields.is_empty() {
        return Err(AppError::from(fields).with_revision(revision_id));
    }

    let option = state
        .repo
        .add_option(&request)
        .await
        .map_err(|e| e.with_revision(revision_id))?;

    tracing::info!(
        option_id = option.id,
        session_id = request.voting_session_id,
        name = %option.name,
        "Option added"
    );
    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    Ok(Keyed::created("option", option, new_revision).with_message("Option added successfully"))
}

/// POST /api/options/:id/vote - Change an option's vote count.
pub async fn vote_option(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Proposal> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let request = json_body(payload, revision_id)?;

    let option = state
        .repo
        .vote(id, i64::from(request.delta))
        .await
        .map_err(|e| e.with_revision(revision_id))?;

    tracing::info!(option_id = id, delta = request.delta, votes = option.votes, "Vote recorded");
    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    Ok(ApiResponse::new(option, new_revision).with_message("Vote recorded successfully"))
}
