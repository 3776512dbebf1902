//! Batch changes applied under strict validation (templates, import).

use serde::Serialize;

use crate::error::SettingsError;
use crate::models::{
    ChangeAction, ChangeRecord, DiffEntry, FieldError, SettingsDocument, ValidationMode,
};
use crate::services::diff;
use crate::services::validation::{CommitDecision, ValidationPipeline};

/// A candidate document and the changes it makes to the live one.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    candidate: SettingsDocument,
    changes: Vec<DiffEntry>,
}

impl BatchPlan {
    pub fn new(current: &SettingsDocument, candidate: SettingsDocument) -> Self {
        let changes = diff::changes(current, &candidate);
        Self { candidate, changes }
    }

    pub fn changes(&self) -> &[DiffEntry] {
        &self.changes
    }

    pub fn candidate(&self) -> &SettingsDocument {
        &self.candidate
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Strict decision over every added or modified field of the candidate.
    pub fn decide(&self, pipeline: &ValidationPipeline) -> CommitDecision {
        pipeline.decide(ValidationMode::Strict, &self.changes, &self.candidate)
    }

    /// Reject the plan when any changed field fails validation.
    pub fn validate(&self, pipeline: &ValidationPipeline) -> Result<(), SettingsError> {
        self.decide(pipeline).into_result().map(|_| ())
    }

    /// One change record per changed field.
    pub fn records(&self, action: ChangeAction, actor: Option<&str>) -> Vec<ChangeRecord> {
        self.changes
            .iter()
            .map(|entry| {
                ChangeRecord::new(
                    entry.category.clone(),
                    entry.key.clone(),
                    entry.value_before.clone(),
                    entry.value_after.clone(),
                    action,
                )
                .with_actor(actor.map(str::to_string))
            })
            .collect()
    }

    pub fn into_candidate(self) -> SettingsDocument {
        self.candidate
    }

    /// Preview of the plan for display.
    pub fn preview(&self, pipeline: &ValidationPipeline) -> BatchPreview {
        let decision = self.decide(pipeline);
        BatchPreview {
            summary: diff::summarize(&self.changes),
            can_apply: decision.can_apply(),
            changes: self.changes.clone(),
            errors: decision.errors().to_vec(),
        }
    }
}

/// Changes and validation errors of a batch that has not been applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPreview {
    pub changes: Vec<DiffEntry>,
    pub summary: crate::models::DiffSummary,
    pub errors: Vec<FieldError>,
    /// False while any error remains.
    pub can_apply: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn current() -> SettingsDocument {
        SettingsDocument::from_value(json!({
            "system": {"maxUsers": 500},
            "maps": {"defaultZoom": 12}
        }))
        .unwrap()
    }

    #[test]
    fn test_plan_collects_changes_only() {
        let candidate = SettingsDocument::from_value(json!({
            "system": {"maxUsers": 10000},
            "maps": {"defaultZoom": 12}
        }))
        .unwrap();
        let plan = BatchPlan::new(&current(), candidate);
        assert_eq!(plan.changes().len(), 1);
        assert!(plan
            .validate(&ValidationPipeline::with_default_rules())
            .is_ok());

        let records = plan.records(ChangeAction::TemplateApplied, Some("admin"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, ChangeAction::TemplateApplied);
        assert_eq!(records[0].old_value, Some(json!(500)));
    }

    #[test]
    fn test_plan_rejects_invalid_field() {
        let candidate = SettingsDocument::from_value(json!({
            "system": {"maxUsers": 10000},
            "maps": {"defaultZoom": 99}
        }))
        .unwrap();
        let plan = BatchPlan::new(&current(), candidate);
        let pipeline = ValidationPipeline::with_default_rules();

        match plan.validate(&pipeline) {
            Err(SettingsError::Validation { errors }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "defaultZoom");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let preview = plan.preview(&pipeline);
        assert!(!preview.can_apply);
        assert_eq!(preview.summary.modified, 2);
    }
}
