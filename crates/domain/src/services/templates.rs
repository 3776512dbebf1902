//! Named preset documents applied as a batch.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::error::SettingsError;
use crate::models::SettingsDocument;
use crate::services::batch::BatchPlan;

/// A named partial settings document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    pub description: String,
    pub settings: SettingsDocument,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        settings: SettingsDocument,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            settings,
        }
    }

    /// Plan the changes this template makes to `current`.
    ///
    /// Fields the template does not mention keep their current values.
    pub fn plan(&self, current: &SettingsDocument) -> BatchPlan {
        BatchPlan::new(current, current.merged_with(&self.settings))
    }
}

/// Template listing entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub name: String,
    pub description: String,
    pub total_settings: usize,
}

/// Lookup of templates by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Template>,
}

impl TemplateCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The `development`, `staging` and `production` presets.
    pub fn builtin() -> Self {
        Self::empty()
            .with_template(preset(
                "development",
                "Verbose logging, relaxed security, no backups",
                json!({
                    "system": {
                        "debugMode": true,
                        "logLevel": "debug",
                        "maxUsers": 50,
                        "apiRateLimit": 10000
                    },
                    "security": {
                        "twoFactorAuth": false,
                        "sessionTimeout": 480
                    },
                    "backup": {
                        "autoBackup": false
                    }
                }),
            ))
            .with_template(preset(
                "staging",
                "Production-like security with moderate limits",
                json!({
                    "system": {
                        "debugMode": false,
                        "logLevel": "info",
                        "maxUsers": 1000
                    },
                    "security": {
                        "twoFactorAuth": true,
                        "sessionTimeout": 120
                    },
                    "backup": {
                        "autoBackup": true,
                        "retentionDays": 14
                    }
                }),
            ))
            .with_template(preset(
                "production",
                "Strict security, daily backups, conservative rate limits",
                json!({
                    "system": {
                        "debugMode": false,
                        "logLevel": "warn",
                        "maxUsers": 10000,
                        "maintenanceMode": false,
                        "apiRateLimit": 1000
                    },
                    "security": {
                        "twoFactorAuth": true,
                        "sessionTimeout": 30,
                        "passwordMinLength": 12,
                        "maxLoginAttempts": 5
                    },
                    "backup": {
                        "autoBackup": true,
                        "retentionDays": 90
                    }
                }),
            ))
    }

    /// Add or replace a template.
    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.insert(template.name.clone(), template);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Template, SettingsError> {
        self.templates
            .get(name)
            .ok_or_else(|| SettingsError::TemplateNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<TemplateSummary> {
        self.templates
            .values()
            .map(|t| TemplateSummary {
                name: t.name.clone(),
                description: t.description.clone(),
                total_settings: t.settings.total_settings(),
            })
            .collect()
    }
}

fn preset(name: &str, description: &str, settings: serde_json::Value) -> Template {
    let settings = SettingsDocument::from_value(settings).unwrap_or_default();
    Template::new(name, description, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{default_settings, ChangeType};
    use crate::services::validation::ValidationPipeline;

    #[test]
    fn test_builtin_presets_present() {
        let catalog = TemplateCatalog::builtin();
        let names: Vec<String> = catalog.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["development", "production", "staging"]);
        assert!(catalog.get("production").unwrap().settings.total_settings() > 0);
    }

    #[test]
    fn test_unknown_template() {
        let err = TemplateCatalog::builtin().get("qa").unwrap_err();
        assert!(matches!(err, SettingsError::TemplateNotFound(name) if name == "qa"));
    }

    #[test]
    fn test_builtin_presets_validate_against_defaults() {
        let pipeline = ValidationPipeline::with_default_rules();
        let catalog = TemplateCatalog::builtin();
        for summary in catalog.list() {
            let plan = catalog.get(&summary.name).unwrap().plan(&default_settings());
            assert!(plan.decide(&pipeline).errors().is_empty(), "{} invalid", summary.name);
        }
    }

    #[test]
    fn test_production_on_minimal_document() {
        let current = SettingsDocument::from_value(json!({"system": {"maxUsers": 500}})).unwrap();
        let plan = TemplateCatalog::builtin()
            .get("production")
            .unwrap()
            .plan(&current);

        let modified: Vec<_> = plan
            .changes()
            .iter()
            .filter(|e| e.change_type == ChangeType::Modified)
            .collect();
        assert_eq!(modified.len(), 1);
        assert_eq!(modified[0].key, "maxUsers");
        assert_eq!(modified[0].value_before, Some(json!(500)));
        assert_eq!(modified[0].value_after, Some(json!(10000)));
        assert!(plan
            .changes()
            .iter()
            .all(|e| e.change_type != ChangeType::Removed));
    }
}
