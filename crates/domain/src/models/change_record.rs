//! Change record models for the per-field change history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::SettingValue;

/// What kind of operation produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    Modified,
    Imported,
    RolledBack,
    TemplateApplied,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Modified => write!(f, "modified"),
            ChangeAction::Imported => write!(f, "imported"),
            ChangeAction::RolledBack => write!(f, "rolled-back"),
            ChangeAction::TemplateApplied => write!(f, "template-applied"),
        }
    }
}

/// A single field mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    /// Field key, dot-joined for nested sub-fields.
    pub field: String,
    pub old_value: Option<SettingValue>,
    pub new_value: Option<SettingValue>,
    pub action: ChangeAction,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl ChangeRecord {
    pub fn new(
        category: impl Into<String>,
        field: impl Into<String>,
        old_value: Option<SettingValue>,
        new_value: Option<SettingValue>,
        action: ChangeAction,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category: category.into(),
            field: field.into(),
            old_value,
            new_value,
            action,
            valid: true,
            actor: None,
        }
    }

    pub fn with_validity(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    /// `category.field` key for this record.
    pub fn qualified_field(&self) -> String {
        format!("{}.{}", self.category, self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_action_serialization() {
        assert_eq!(
            serde_json::to_string(&ChangeAction::RolledBack).unwrap(),
            "\"rolled-back\""
        );
        assert_eq!(
            serde_json::to_string(&ChangeAction::TemplateApplied).unwrap(),
            "\"template-applied\""
        );
        assert_eq!(
            serde_json::from_str::<ChangeAction>("\"imported\"").unwrap(),
            ChangeAction::Imported
        );
    }

    #[test]
    fn test_change_action_display() {
        assert_eq!(ChangeAction::Modified.to_string(), "modified");
        assert_eq!(ChangeAction::RolledBack.to_string(), "rolled-back");
    }

    #[test]
    fn test_change_record_builder() {
        let record = ChangeRecord::new(
            "email",
            "smtp.host",
            Some(json!("a.example.com")),
            Some(json!("b.example.com")),
            ChangeAction::Modified,
        )
        .with_validity(false)
        .with_actor(Some("ops@example.com".to_string()));

        assert!(!record.valid);
        assert_eq!(record.qualified_field(), "email.smtp.host");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["oldValue"], json!("a.example.com"));
        assert_eq!(json["action"], json!("modified"));
    }
}
