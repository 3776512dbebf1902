//! Settings template endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::services::{BatchOutcome, BatchPreview, TemplateSummary};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Actor;
use crate::middleware::metrics::record_settings_committed;

/// GET /api/v1/templates
pub async fn list_templates(State(state): State<AppState>) -> Json<Vec<TemplateSummary>> {
    Json(state.controller.lock().await.templates())
}

/// GET /api/v1/templates/:name/preview
pub async fn preview_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BatchPreview>, ApiError> {
    let preview = state.controller.lock().await.preview_template(&name)?;
    Ok(Json(preview))
}

/// POST /api/v1/templates/:name/apply
///
/// All-or-nothing: any invalid field rejects the whole template.
pub async fn apply_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    actor: Actor,
) -> Result<Json<BatchOutcome>, ApiError> {
    let outcome = state
        .controller
        .lock()
        .await
        .apply_template(&name, actor.as_deref())
        .await?;

    record_settings_committed("template", outcome.applied);
    info!(template = %name, applied = outcome.applied, "Template applied");
    Ok(Json(outcome))
}
