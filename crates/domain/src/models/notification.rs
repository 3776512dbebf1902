//! Notification policy and payload models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::change_record::ChangeAction;
use super::document::SettingValue;

/// Controls which committed changes produce an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPolicy {
    pub enabled: bool,
    #[validate(custom(function = "validate_recipients"))]
    pub recipients: BTreeSet<String>,
    pub critical_only: bool,
    pub monitored_categories: BTreeSet<String>,
    pub include_old_value: bool,
    pub include_new_value: bool,
    pub include_actor_info: bool,
}

fn validate_recipients(recipients: &BTreeSet<String>) -> Result<(), validator::ValidationError> {
    recipients
        .iter()
        .try_for_each(|r| shared::validation::validate_email_address(r))
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            recipients: BTreeSet::new(),
            critical_only: true,
            monitored_categories: ["security", "system"]
                .into_iter()
                .map(String::from)
                .collect(),
            include_old_value: true,
            include_new_value: true,
            include_actor_info: true,
        }
    }
}

/// Alert sent for a committed change, redacted according to the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub recipients: Vec<String>,
    pub category: String,
    pub field: String,
    pub action: ChangeAction,
    pub critical: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<SettingValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<SettingValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_disabled() {
        let policy = NotificationPolicy::default();
        assert!(!policy.enabled);
        assert!(policy.critical_only);
        assert!(policy.monitored_categories.contains("security"));
    }

    #[test]
    fn test_policy_deserialize_camel_case() {
        let json = r#"{
            "enabled": true,
            "recipients": ["ops@example.com"],
            "criticalOnly": false,
            "monitoredCategories": ["security"],
            "includeOldValue": false,
            "includeNewValue": true,
            "includeActorInfo": false
        }"#;
        let policy: NotificationPolicy = serde_json::from_str(json).unwrap();
        assert!(policy.enabled);
        assert!(!policy.critical_only);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_accepts_generated_recipients() {
        use fake::faker::internet::en::SafeEmail;
        use fake::Fake;

        let recipients: BTreeSet<String> = (0..5).map(|_| SafeEmail().fake::<String>()).collect();
        let policy = NotificationPolicy {
            enabled: true,
            recipients,
            ..NotificationPolicy::default()
        };
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_rejects_bad_recipient() {
        let policy = NotificationPolicy {
            recipients: ["not-an-address".to_string()].into_iter().collect(),
            ..NotificationPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_payload_skips_redacted_fields() {
        let payload = NotificationPayload {
            recipients: vec!["ops@example.com".to_string()],
            category: "security".to_string(),
            field: "twoFactorAuth".to_string(),
            action: ChangeAction::Modified,
            critical: true,
            timestamp: Utc::now(),
            old_value: None,
            new_value: Some(serde_json::json!(true)),
            actor: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("oldValue"));
        assert!(!object.contains_key("actor"));
        assert_eq!(object["newValue"], serde_json::json!(true));
    }
}
