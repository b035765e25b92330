//! Health and revision endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{success, ApiResult};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
}

/// GET /health - Plain-text liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/health - Liveness including a database round trip.
pub async fn api_health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    let revision_id = state
        .repo
        .get_revision_id()
        .await
        .map_err(|e| e.with_revision(0))?;

    success(HealthStatus { status: "UP" }, revision_id)
}

/// GET /api/revision - Current write counter.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_id = state
        .repo
        .get_revision_id()
        .await
        .map_err(|e| e.with_revision(0))?;

    success(RevisionInfo { revision_id }, revision_id)
}
