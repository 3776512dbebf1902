//! Validation result models.

use serde::{Deserialize, Serialize};

/// Verdict of validating a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(message.into()),
        }
    }
}

impl From<validator::ValidationError> for ValidationResult {
    fn from(err: validator::ValidationError) -> Self {
        let message = err
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| err.code.to_string());
        Self::invalid(message)
    }
}

/// How validation failures affect a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Record the error, still apply the value (interactive edits).
    Permissive,
    /// Any error blocks the whole operation (import, templates).
    Strict,
}

/// A validation failure attributed to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub category: String,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.category, self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_validation_error_uses_message() {
        let mut err = validator::ValidationError::new("range_min");
        err.message = Some("Must be at least 6".into());
        let result = ValidationResult::from(err);
        assert!(!result.is_valid);
        assert_eq!(result.error.as_deref(), Some("Must be at least 6"));
    }

    #[test]
    fn test_from_validation_error_falls_back_to_code() {
        let err = validator::ValidationError::new("port");
        assert_eq!(ValidationResult::from(err).error.as_deref(), Some("port"));
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError {
            category: "maps".to_string(),
            field: "defaultZoom".to_string(),
            message: "Must be at most 20".to_string(),
        };
        assert_eq!(err.to_string(), "maps.defaultZoom: Must be at most 20");
    }
}
