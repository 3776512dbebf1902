//! Version snapshot and rollback endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{DiffEntry, DiffSummary, VersionId, VersionSnapshot, VersionSummary};
use domain::services::{diff, RollbackOutcome, SaveStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Actor;
use crate::middleware::metrics::{
    record_save_degraded, record_settings_committed, record_versions_retained,
};

/// Author used when no `X-Actor` header was sent.
const DEFAULT_AUTHOR: &str = "admin";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVersionRequest {
    #[validate(length(min = 1, max = 200, message = "Description must be 1-200 characters"))]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionResponse {
    pub version: VersionSummary,
    pub save_status: SaveStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    pub version_id: VersionId,
    pub summary: DiffSummary,
    pub entries: Vec<DiffEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RollbackRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RollbackResponse {
    /// Changes the rollback would make; nothing applied.
    Preview {
        #[serde(rename = "versionId")]
        version_id: VersionId,
        summary: DiffSummary,
        changes: Vec<DiffEntry>,
    },
    Applied(RollbackOutcome),
    Cancelled,
}

/// GET /api/v1/versions
pub async fn list_versions(State(state): State<AppState>) -> Json<Vec<VersionSummary>> {
    Json(state.controller.lock().await.versions())
}

/// GET /api/v1/versions/:id
pub async fn get_version(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VersionSnapshot>, ApiError> {
    let controller = state.controller.lock().await;
    Ok(Json(controller.version(VersionId(id))?.clone()))
}

/// POST /api/v1/versions
pub async fn create_version(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateVersionRequest>,
) -> Result<(StatusCode, Json<CreateVersionResponse>), ApiError> {
    request.validate()?;

    let mut controller = state.controller.lock().await;
    let (version, save_status) = controller
        .create_snapshot(actor.author_or(DEFAULT_AUTHOR), request.description.trim())
        .await;

    if save_status.warning().is_some() {
        record_save_degraded();
    }
    record_versions_retained(controller.versions().len());

    Ok((
        StatusCode::CREATED,
        Json(CreateVersionResponse {
            version,
            save_status,
        }),
    ))
}

/// DELETE /api/v1/versions/:id
pub async fn delete_version(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SaveStatus>, ApiError> {
    let mut controller = state.controller.lock().await;
    let status = controller.delete_version(VersionId(id)).await?;
    record_versions_retained(controller.versions().len());
    Ok(Json(status))
}

/// GET /api/v1/versions/:id/diff
///
/// Live document on the left, snapshot on the right.
pub async fn diff_version(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DiffResponse>, ApiError> {
    let entries = state.controller.lock().await.diff_against(VersionId(id))?;
    Ok(Json(DiffResponse {
        version_id: VersionId(id),
        summary: diff::summarize(&entries),
        entries,
    }))
}

/// POST /api/v1/versions/:id/rollback
///
/// Without `confirm` only the preview is returned; with it the rollback is
/// applied.
pub async fn rollback(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    actor: Actor,
    body: Option<Json<RollbackRequest>>,
) -> Result<Json<RollbackResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let id = VersionId(id);
    let mut controller = state.controller.lock().await;

    if !request.confirm {
        let entries = controller.preview_rollback(id)?;
        let changes: Vec<DiffEntry> = entries.into_iter().filter(DiffEntry::is_change).collect();
        return Ok(Json(RollbackResponse::Preview {
            version_id: id,
            summary: diff::summarize(&changes),
            changes,
        }));
    }

    let outcome = controller.rollback(id, actor.as_deref()).await?;
    record_settings_committed("rollback", outcome.applied);
    record_versions_retained(controller.versions().len());
    Ok(Json(RollbackResponse::Applied(outcome)))
}

/// DELETE /api/v1/versions/rollback
///
/// Drops a pending rollback preview.
pub async fn cancel_rollback(
    State(state): State<AppState>,
) -> Result<Json<RollbackResponse>, ApiError> {
    state.controller.lock().await.cancel_rollback()?;
    Ok(Json(RollbackResponse::Cancelled))
}
