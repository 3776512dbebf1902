//! Live settings document endpoints.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use domain::models::{ChangeRecord, ExportFile, SettingValue, ValidationResult};
use domain::services::{BatchOutcome, BatchPreview, FieldUpdate, SaveStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Actor;
use crate::middleware::metrics::{record_save_degraded, record_settings_committed};

/// Live document plus the state an editor needs alongside it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub settings: serde_json::Value,
    pub field_errors: BTreeMap<String, String>,
    pub disabled_categories: BTreeSet<String>,
    pub total_settings: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub value: SettingValue,
}

#[derive(Debug, Deserialize)]
pub struct SetCategoryEnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStateResponse {
    pub category: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    /// Check the file and return the planned changes without applying them.
    #[serde(default)]
    pub preview: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ImportResponse {
    Preview(BatchPreview),
    Applied(BatchOutcome),
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one `category.field`.
    pub field: Option<String>,
}

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let controller = state.controller.lock().await;
    let document = controller.document();

    Json(SettingsResponse {
        settings: document.to_value(),
        field_errors: controller.field_errors().clone(),
        disabled_categories: controller.disabled_categories().clone(),
        total_settings: document.total_settings(),
    })
}

/// PUT /api/v1/settings/:category/:field
///
/// Permissive edit: an invalid value is applied and reported in `validation`.
pub async fn update_field(
    State(state): State<AppState>,
    Path((category, field)): Path<(String, String)>,
    actor: Actor,
    Json(request): Json<UpdateFieldRequest>,
) -> Result<Json<FieldUpdate>, ApiError> {
    let mut controller = state.controller.lock().await;
    let update = controller
        .update_field(&category, &field, request.value, actor.as_deref())
        .await?;

    if update.record.is_some() {
        record_settings_committed("edit", 1);
    }
    if update.save_status.as_ref().is_some_and(|s| s.warning().is_some()) {
        record_save_degraded();
    }
    Ok(Json(update))
}

/// POST /api/v1/settings/:category/:field/validate
///
/// Dry-run validation of a value without touching the document.
pub async fn validate_field(
    State(state): State<AppState>,
    Path((category, field)): Path<(String, String)>,
    Json(request): Json<UpdateFieldRequest>,
) -> Json<ValidationResult> {
    let controller = state.controller.lock().await;
    Json(controller.validate_field(&category, &field, &request.value))
}

/// POST /api/v1/settings/save
pub async fn save(State(state): State<AppState>) -> Json<SaveStatus> {
    let status = state.controller.lock().await.save().await;
    if status.warning().is_some() {
        record_save_degraded();
    }
    info!(status = ?status, "Manual save");
    Json(status)
}

/// PUT /api/v1/categories/:category/enabled
pub async fn set_category_enabled(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(request): Json<SetCategoryEnabledRequest>,
) -> Result<Json<CategoryStateResponse>, ApiError> {
    let mut controller = state.controller.lock().await;
    if controller.document().category(&category).is_none() {
        return Err(ApiError::NotFound(format!("Unknown category: {}", category)));
    }

    let warning = controller
        .set_category_enabled(&category, request.enabled)
        .await;

    Ok(Json(CategoryStateResponse {
        category,
        enabled: request.enabled,
        warning,
    }))
}

/// GET /api/v1/settings/export
pub async fn export(State(state): State<AppState>) -> impl IntoResponse {
    let file: ExportFile = state.controller.lock().await.export();
    let disposition = format!(
        "attachment; filename=\"settings-{}.json\"",
        file.export_date.format("%Y-%m-%d")
    );
    ([(header::CONTENT_DISPOSITION, disposition)], Json(file))
}

/// POST /api/v1/settings/import
///
/// The body is an export file. With `?preview=true` nothing is applied.
pub async fn import(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    actor: Actor,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut controller = state.controller.lock().await;

    if query.preview {
        let preview = controller.preview_import(&body)?;
        return Ok(Json(ImportResponse::Preview(preview)));
    }

    let outcome = controller.import(&body, actor.as_deref()).await?;
    record_settings_committed("import", outcome.applied);
    info!(applied = outcome.applied, "Settings imported");
    Ok(Json(ImportResponse::Applied(outcome)))
}

/// GET /api/v1/settings/history
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<ChangeRecord>> {
    let entries = state.controller.lock().await.history();
    let entries = match query.field {
        Some(field) => entries
            .into_iter()
            .filter(|record| record.qualified_field() == field)
            .collect(),
        None => entries,
    };
    Json(entries)
}
