//! Notification policy endpoints.

use axum::{extract::State, Json};
use domain::models::NotificationPolicy;
use domain::services::CRITICAL_SETTINGS;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub policy: NotificationPolicy,
    /// `category.field` names that count as critical.
    pub critical_settings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn critical_settings() -> Vec<String> {
    CRITICAL_SETTINGS
        .iter()
        .map(|(category, field)| format!("{}.{}", category, field))
        .collect()
}

/// GET /api/v1/notifications/policy
pub async fn get_policy(State(state): State<AppState>) -> Json<PolicyResponse> {
    Json(PolicyResponse {
        policy: state.gate.policy().await,
        critical_settings: critical_settings(),
        warning: None,
    })
}

/// PUT /api/v1/notifications/policy
pub async fn update_policy(
    State(state): State<AppState>,
    Json(policy): Json<NotificationPolicy>,
) -> Result<Json<PolicyResponse>, ApiError> {
    let warning = state.gate.update_policy(policy).await?;
    Ok(Json(PolicyResponse {
        policy: state.gate.policy().await,
        critical_settings: critical_settings(),
        warning,
    }))
}
