//! Health check endpoint handlers.

use axum::{extract::State, Json};
use domain::services::{RollbackState, SaveStatus};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub remote_configured: bool,
    pub rollback_state: RollbackState,
    pub autosave: AutoSaveHealth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AutoSaveHealth {
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<SaveStatus>,
}

/// Simple status response for liveness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health check endpoint.
///
/// Reports `degraded` when the last auto-save did not reach the remote API.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let controller = state.controller.lock().await;
    let last_status = controller.last_autosave();
    let degraded = last_status
        .as_ref()
        .is_some_and(|status| status.warning().is_some());

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        remote_configured: state.config.remote_enabled(),
        rollback_state: controller.rollback_state(),
        autosave: AutoSaveHealth {
            pending: controller.autosave_pending(),
            last_status,
        },
    })
}

/// Liveness probe endpoint.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serializes_degraded_autosave() {
        let response = HealthResponse {
            status: "degraded".to_string(),
            version: "0.3.0".to_string(),
            remote_configured: true,
            rollback_state: RollbackState::Idle,
            autosave: AutoSaveHealth {
                pending: false,
                last_status: Some(SaveStatus::SavedLocallyOnly {
                    warning: "Remote request failed: timeout".to_string(),
                }),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["rollback_state"], "idle");
        assert_eq!(json["autosave"]["last_status"]["status"], "savedLocallyOnly");
    }

    #[test]
    fn test_health_response_omits_missing_autosave_status() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.3.0".to_string(),
            remote_configured: false,
            rollback_state: RollbackState::Previewing,
            autosave: AutoSaveHealth {
                pending: true,
                last_status: None,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["autosave"].get("last_status").is_none());
        assert_eq!(json["autosave"]["pending"], true);
    }
}
