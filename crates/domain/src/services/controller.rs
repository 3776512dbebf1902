//! Settings controller.
//!
//! Single owner of the live document, the version store, the change history
//! and the rollback engine. Every mutation goes through here, in one
//! direction: validate, update state, append history, publish events.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SettingsError;
use crate::models::document::values_equal;
use crate::models::{
    default_settings, ChangeAction, ChangeRecord, ChangeType, DiffEntry, ExportFile,
    SettingValue, SettingsDocument, ValidationMode, ValidationResult, VersionId,
    VersionSnapshot, VersionSummary,
};
use crate::services::autosave::{AutoSaveTask, DEFAULT_QUIET_PERIOD};
use crate::services::batch::{BatchPlan, BatchPreview};
use crate::services::change_history::ChangeHistoryLog;
use crate::services::diff;
use crate::services::notification::SettingsEvent;
use crate::services::persistence::{LoadSource, Persistence, SaveStatus};
use crate::services::rollback::{RollbackEngine, RollbackReport, RollbackState};
use crate::services::templates::{TemplateCatalog, TemplateSummary};
use crate::services::validation::{CommitDecision, ValidationPipeline};
use crate::services::version_store::VersionStore;

/// Author recorded on snapshots taken without an actor.
const SYSTEM_AUTHOR: &str = "system";

/// Controller construction options.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub autosave_quiet_period: Duration,
    /// Take a snapshot before each single-field edit that changes the document.
    pub snapshot_on_edit: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            autosave_quiet_period: DEFAULT_QUIET_PERIOD,
            snapshot_on_edit: true,
        }
    }
}

/// Result of a single-field edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    /// `None` when the value was already in place.
    pub record: Option<ChangeRecord>,
    pub validation: ValidationResult,
    pub snapshot: Option<VersionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_status: Option<SaveStatus>,
}

/// Result of an import or template application.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub applied: usize,
    pub changes: Vec<DiffEntry>,
    pub snapshot: Option<VersionSummary>,
    pub warnings: Vec<String>,
}

/// Result of a committed rollback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub target: VersionId,
    pub applied: usize,
    pub changes: Vec<DiffEntry>,
    pub safety_snapshot: Option<VersionSummary>,
    pub warnings: Vec<String>,
}

/// Owner of the live settings document.
pub struct SettingsController {
    document: SettingsDocument,
    versions: VersionStore,
    history: ChangeHistoryLog,
    pipeline: ValidationPipeline,
    templates: TemplateCatalog,
    rollback: RollbackEngine,
    disabled_categories: BTreeSet<String>,
    field_errors: BTreeMap<String, String>,
    persistence: Persistence,
    autosave: AutoSaveTask,
    snapshot_on_edit: bool,
    events: Option<mpsc::UnboundedSender<SettingsEvent>>,
}

impl SettingsController {
    pub fn new(persistence: Persistence, options: ControllerOptions) -> Self {
        Self {
            document: default_settings(),
            versions: VersionStore::new(),
            history: ChangeHistoryLog::new(),
            pipeline: ValidationPipeline::with_default_rules(),
            templates: TemplateCatalog::builtin(),
            rollback: RollbackEngine::new(),
            disabled_categories: BTreeSet::new(),
            field_errors: BTreeMap::new(),
            persistence,
            autosave: AutoSaveTask::new(options.autosave_quiet_period),
            snapshot_on_edit: options.snapshot_on_edit,
            events: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: ValidationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_templates(mut self, templates: TemplateCatalog) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_document(mut self, document: SettingsDocument) -> Self {
        self.document = document;
        self.refresh_field_errors();
        self
    }

    /// Receiver of `Committed` events for every committed change.
    ///
    /// Replaces any previous subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SettingsEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Load the document (remote, then local cache, then defaults) and history.
    pub async fn load(&mut self) -> LoadSource {
        let source = match self.persistence.load_document().await {
            Some((document, source)) => {
                self.document = document;
                source
            }
            None => {
                warn!("No persisted settings found, using defaults");
                self.document = default_settings();
                LoadSource::Defaults
            }
        };

        self.disabled_categories = self.persistence.load_disabled_categories().await;
        self.versions.restore(self.persistence.load_versions().await);
        self.refresh_field_errors();

        info!(
            source = ?source,
            categories = self.document.total_categories(),
            versions = self.versions.len(),
            "Settings loaded"
        );
        source
    }

    pub fn document(&self) -> &SettingsDocument {
        &self.document
    }

    pub fn versions(&self) -> Vec<VersionSummary> {
        self.versions.list().map(VersionSummary::from).collect()
    }

    pub fn version(&self, id: VersionId) -> Result<&VersionSnapshot, SettingsError> {
        self.versions.get(id)
    }

    /// Change records, newest first.
    pub fn history(&self) -> Vec<ChangeRecord> {
        self.history.entries().cloned().collect()
    }

    /// Current inline errors keyed by `category.field`.
    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    pub fn disabled_categories(&self) -> &BTreeSet<String> {
        &self.disabled_categories
    }

    pub fn templates(&self) -> Vec<TemplateSummary> {
        self.templates.list()
    }

    pub fn rollback_state(&self) -> RollbackState {
        self.rollback.state()
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn last_autosave(&self) -> Option<SaveStatus> {
        self.autosave.last_status()
    }

    /// Set one field with permissive validation.
    ///
    /// An invalid value is still applied; the error is recorded against the
    /// field and on the change record.
    pub async fn update_field(
        &mut self,
        category: &str,
        field_path: &str,
        value: SettingValue,
        actor: Option<&str>,
    ) -> Result<FieldUpdate, SettingsError> {
        if self.disabled_categories.contains(category) {
            return Err(SettingsError::CategoryDisabled(category.to_string()));
        }

        let mut candidate = self.document.clone();
        let old_value = candidate.set_path(category, field_path, value.clone())?;
        let entry = field_entry(category, field_path, old_value.clone(), value.clone());
        let decision = self.decide(ValidationMode::Permissive, &[entry], &candidate);
        let validation = decision.result_for(category, field_path);

        let unchanged = old_value
            .as_ref()
            .map(|old| values_equal(old, &value))
            .unwrap_or(false);
        if unchanged {
            debug!(category = %category, field = %field_path, "Field already has this value");
            return Ok(FieldUpdate {
                record: None,
                validation,
                snapshot: None,
                save_status: None,
            });
        }

        let (snapshot, save_status) = if self.snapshot_on_edit {
            let description = format!("Auto-save before editing {}.{}", category, field_path);
            let snapshot = self
                .versions
                .snapshot(&self.document, actor.unwrap_or(SYSTEM_AUTHOR), description);
            let status = self
                .persistence
                .save_version(&snapshot, &self.versions.to_vec())
                .await;
            (Some(VersionSummary::from(&snapshot)), Some(status))
        } else {
            (None, None)
        };

        self.document = candidate;
        self.refresh_field_errors();
        self.record_field_errors(&decision);
        let record = ChangeRecord::new(
            category,
            field_path,
            old_value,
            Some(value),
            ChangeAction::Modified,
        )
        .with_validity(validation.is_valid)
        .with_actor(actor.map(str::to_string));
        self.history.append(record.clone());
        self.publish(&record);

        self.autosave.rearm(
            self.persistence.clone(),
            self.document.clone(),
            self.disabled_categories.clone(),
        );

        info!(
            category = %category,
            field = %field_path,
            valid = validation.is_valid,
            "Setting updated"
        );

        Ok(FieldUpdate {
            record: Some(record),
            validation,
            snapshot,
            save_status,
        })
    }

    /// Validate a value without applying it.
    pub fn validate_field(
        &self,
        category: &str,
        field_path: &str,
        value: &SettingValue,
    ) -> ValidationResult {
        let mut candidate = self.document.clone();
        match candidate.set_path(category, field_path, value.clone()) {
            Ok(old_value) => {
                let entry = field_entry(category, field_path, old_value, value.clone());
                self.decide(ValidationMode::Permissive, &[entry], &candidate)
                    .result_for(category, field_path)
            }
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }

    fn decide(
        &self,
        mode: ValidationMode,
        entries: &[DiffEntry],
        candidate: &SettingsDocument,
    ) -> CommitDecision {
        let decision = self.pipeline.decide(mode, entries, candidate);
        for error in decision.errors() {
            debug!(
                mode = ?mode,
                category = %error.category,
                field = %error.field,
                error = %error.message,
                "Validation failed"
            );
        }
        decision
    }

    /// Keep the errors of an applied decision for fields outside the top-level
    /// sweep of `refresh_field_errors` (nested paths).
    fn record_field_errors(&mut self, decision: &CommitDecision) {
        for error in decision.errors() {
            self.field_errors.insert(
                format!("{}.{}", error.category, error.field),
                error.message.clone(),
            );
        }
    }

    /// Revalidate every bound field of the live document.
    fn refresh_field_errors(&mut self) {
        let entries = diff::diff(&SettingsDocument::new(), &self.document);
        self.field_errors = self
            .pipeline
            .validate_changes(&entries, &self.document)
            .into_iter()
            .map(|e| (format!("{}.{}", e.category, e.field), e.message))
            .collect();
    }

    /// Diff the live document against a stored version.
    pub fn diff_against(&self, id: VersionId) -> Result<Vec<DiffEntry>, SettingsError> {
        let snapshot = self.versions.get(id)?;
        Ok(diff::diff(&self.document, &snapshot.settings))
    }

    /// Take a manual snapshot of the live document.
    pub async fn create_snapshot(
        &mut self,
        author: &str,
        description: &str,
    ) -> (VersionSummary, SaveStatus) {
        let snapshot = self.versions.snapshot(&self.document, author, description);
        let status = self
            .persistence
            .save_version(&snapshot, &self.versions.to_vec())
            .await;
        info!(version_id = %snapshot.id, author = %author, "Snapshot created");
        (VersionSummary::from(&snapshot), status)
    }

    pub async fn delete_version(&mut self, id: VersionId) -> Result<SaveStatus, SettingsError> {
        self.versions.delete(id)?;
        if self.rollback.pending_target() == Some(id) {
            self.rollback.cancel()?;
        }
        let status = self
            .persistence
            .delete_version(id, &self.versions.to_vec())
            .await;
        info!(version_id = %id, "Snapshot deleted");
        Ok(status)
    }

    /// Preview a rollback to `id`.
    pub fn preview_rollback(&mut self, id: VersionId) -> Result<Vec<DiffEntry>, SettingsError> {
        let target = self.versions.get(id)?.clone();
        self.rollback.preview(&self.document, &target)
    }

    /// Confirm and apply a rollback to `id`.
    ///
    /// Uses the pending preview of `id` when there is one, so a document
    /// edited since that preview fails the rollback.
    pub async fn rollback(
        &mut self,
        id: VersionId,
        actor: Option<&str>,
    ) -> Result<RollbackOutcome, SettingsError> {
        let previewing = self.rollback.state() == RollbackState::Previewing
            && self.rollback.pending_target() == Some(id);
        if !previewing {
            self.preview_rollback(id)?;
        }
        self.rollback.confirm()?;
        self.autosave.cancel();

        let events = self.events.clone();
        let report: RollbackReport = self.rollback.apply(
            &mut self.document,
            &mut self.versions,
            &mut self.history,
            &self.pipeline,
            actor,
            |record| publish_to(&events, record),
        )?;

        let mut warnings = Vec::new();
        if let Some(safety) = &report.safety_snapshot {
            let status = self
                .persistence
                .save_version(safety, &self.versions.to_vec())
                .await;
            warnings.extend(status.warning().map(str::to_string));

            self.refresh_field_errors();
            let status = self
                .persistence
                .save_document(&self.document, &self.disabled_categories)
                .await;
            warnings.extend(status.warning().map(str::to_string));
            warnings.extend(self.persistence.record_rollback(id).await);
        }

        Ok(RollbackOutcome {
            target: report.target,
            applied: report.applied_changes(),
            safety_snapshot: report.safety_snapshot.as_ref().map(VersionSummary::from),
            changes: report.changes,
            warnings,
        })
    }

    /// Drop a pending rollback preview.
    pub fn cancel_rollback(&mut self) -> Result<(), SettingsError> {
        self.rollback.cancel()
    }

    pub fn preview_template(&self, name: &str) -> Result<BatchPreview, SettingsError> {
        let template = self.templates.get(name)?;
        Ok(template.plan(&self.document).preview(&self.pipeline))
    }

    /// Apply a template under strict validation.
    pub async fn apply_template(
        &mut self,
        name: &str,
        actor: Option<&str>,
    ) -> Result<BatchOutcome, SettingsError> {
        let plan = self.templates.get(name)?.plan(&self.document);
        let description = format!("Before applying template {}", name);
        self.commit_batch(plan, ChangeAction::TemplateApplied, actor, description)
            .await
    }

    pub fn export(&self) -> ExportFile {
        ExportFile::from_document(&self.document)
    }

    /// Parse and check an export file without applying it.
    pub fn preview_import(&self, json: &str) -> Result<BatchPreview, SettingsError> {
        let candidate = parse_import(json)?;
        Ok(BatchPlan::new(&self.document, candidate).preview(&self.pipeline))
    }

    /// Replace the document with an export file under strict validation.
    pub async fn import(
        &mut self,
        json: &str,
        actor: Option<&str>,
    ) -> Result<BatchOutcome, SettingsError> {
        let candidate = parse_import(json)?;
        let plan = BatchPlan::new(&self.document, candidate);
        self.commit_batch(plan, ChangeAction::Imported, actor, "Before import".to_string())
            .await
    }

    async fn commit_batch(
        &mut self,
        plan: BatchPlan,
        action: ChangeAction,
        actor: Option<&str>,
        description: String,
    ) -> Result<BatchOutcome, SettingsError> {
        let decision = self.decide(ValidationMode::Strict, plan.changes(), plan.candidate());
        if let Err(err) = decision.into_result() {
            warn!(action = %action, error = %err, "Batch rejected");
            return Err(err);
        }
        if plan.is_empty() {
            info!(action = %action, "Batch makes no changes");
            return Ok(BatchOutcome {
                applied: 0,
                changes: Vec::new(),
                snapshot: None,
                warnings: Vec::new(),
            });
        }

        self.autosave.cancel();
        let mut warnings = Vec::new();

        let snapshot = self.versions.snapshot(
            &self.document,
            actor.unwrap_or(SYSTEM_AUTHOR),
            description,
        );
        let status = self
            .persistence
            .save_version(&snapshot, &self.versions.to_vec())
            .await;
        warnings.extend(status.warning().map(str::to_string));

        let records = plan.records(action, actor);
        let changes = plan.changes().to_vec();
        self.document = plan.into_candidate();
        self.history.extend(records.iter().cloned());
        for record in &records {
            self.publish(record);
        }
        self.refresh_field_errors();

        let status = self
            .persistence
            .save_document(&self.document, &self.disabled_categories)
            .await;
        warnings.extend(status.warning().map(str::to_string));

        info!(action = %action, applied = records.len(), "Batch committed");
        Ok(BatchOutcome {
            applied: records.len(),
            changes,
            snapshot: Some(VersionSummary::from(&snapshot)),
            warnings,
        })
    }

    /// Switch a category on or off. Persisted to the local cache only.
    pub async fn set_category_enabled(&mut self, category: &str, enabled: bool) -> Option<String> {
        let changed = if enabled {
            self.disabled_categories.remove(category)
        } else {
            self.disabled_categories.insert(category.to_string())
        };
        if !changed {
            return None;
        }

        info!(category = %category, enabled = enabled, "Category toggled");
        match self
            .persistence
            .save_disabled_categories(&self.disabled_categories)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Disabled categories not persisted");
                Some(e.to_string())
            }
        }
    }

    /// Commit the live document now, cancelling any pending auto-save.
    pub async fn save(&mut self) -> SaveStatus {
        self.autosave.cancel();
        self.persistence
            .save_document(&self.document, &self.disabled_categories)
            .await
    }

    fn publish(&self, record: &ChangeRecord) {
        publish_to(&self.events, record);
    }
}

fn publish_to(events: &Option<mpsc::UnboundedSender<SettingsEvent>>, record: &ChangeRecord) {
    if let Some(tx) = events {
        if tx.send(SettingsEvent::Committed(record.clone())).is_err() {
            debug!(field = %record.qualified_field(), "No subscriber for settings events");
        }
    }
}

/// Diff entry for a single-field edit; `field_path` may be dotted.
fn field_entry(
    category: &str,
    field_path: &str,
    old_value: Option<SettingValue>,
    value: SettingValue,
) -> DiffEntry {
    DiffEntry {
        category: category.to_string(),
        key: field_path.to_string(),
        change_type: if old_value.is_some() {
            ChangeType::Modified
        } else {
            ChangeType::Added
        },
        value_before: old_value,
        value_after: Some(value),
    }
}

/// Structural checks on an export file; returns its settings.
fn parse_import(json: &str) -> Result<SettingsDocument, SettingsError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SettingsError::Structural(format!("invalid JSON: {}", e)))?;
    let Value::Object(mut root) = value else {
        return Err(SettingsError::Structural(
            "import file must be a JSON object".to_string(),
        ));
    };
    let settings = root
        .remove("settings")
        .ok_or_else(|| SettingsError::Structural("missing 'settings' key".to_string()))?;
    SettingsDocument::from_value(settings)
}
