//! Domain error types.

use thiserror::Error;

use crate::models::{FieldError, VersionId};
use crate::services::rollback::RollbackState;

/// Errors raised by settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Malformed document or import file; nothing was applied.
    #[error("Invalid settings data: {0}")]
    Structural(String),

    /// Hard validation failed; nothing was applied.
    #[error("{} validation error(s)", .errors.len())]
    Validation { errors: Vec<FieldError> },

    #[error("Version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("Category is disabled: {0}")]
    CategoryDisabled(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The document swap of a rollback failed; the live document is unchanged.
    #[error("Rollback failed: {0}")]
    RollbackApply(String),

    #[error("Cannot {action} a rollback in state {from}")]
    InvalidTransition {
        from: RollbackState,
        action: &'static str,
    },
}

/// Errors raised by remote and local persistence collaborators.
///
/// These never fail an in-memory operation; callers degrade to a warning.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Remote request failed: {0}")]
    Remote(String),

    #[error("Local cache error: {0}")]
    Local(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}
