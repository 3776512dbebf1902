//! Rollback engine.
//!
//! A rollback attempt moves through
//! `Idle -> Previewing -> Confirmed -> Applying -> Committed | Failed`.
//! The live document is replaced in a single assignment after every check
//! has passed, so a failed attempt leaves it as it was.

use serde::Serialize;
use shared::crypto::short_fingerprint;

use crate::error::SettingsError;
use crate::models::{
    ChangeAction, ChangeRecord, DiffEntry, SettingsDocument, ValidationMode, VersionId,
    VersionSnapshot,
};
use crate::services::change_history::ChangeHistoryLog;
use crate::services::diff;
use crate::services::notification::is_critical;
use crate::services::validation::ValidationPipeline;
use crate::services::version_store::VersionStore;

/// Position of the current rollback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackState {
    Idle,
    Previewing,
    Confirmed,
    Applying,
    Committed,
    Failed,
}

impl std::fmt::Display for RollbackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackState::Idle => write!(f, "idle"),
            RollbackState::Previewing => write!(f, "previewing"),
            RollbackState::Confirmed => write!(f, "confirmed"),
            RollbackState::Applying => write!(f, "applying"),
            RollbackState::Committed => write!(f, "committed"),
            RollbackState::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a committed rollback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub target: VersionId,
    /// Snapshot of the document taken just before the swap. `None` for no-ops.
    pub safety_snapshot: Option<VersionSnapshot>,
    pub changes: Vec<DiffEntry>,
    pub records: Vec<ChangeRecord>,
}

impl RollbackReport {
    pub fn applied_changes(&self) -> usize {
        self.changes.len()
    }
}

#[derive(Debug, Clone)]
struct PendingRollback {
    target: VersionId,
    /// Live document fingerprint at preview time.
    base_fingerprint: String,
}

/// Drives one rollback attempt at a time.
#[derive(Debug, Clone)]
pub struct RollbackEngine {
    state: RollbackState,
    pending: Option<PendingRollback>,
}

impl Default for RollbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RollbackEngine {
    pub fn new() -> Self {
        Self {
            state: RollbackState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> RollbackState {
        self.state
    }

    /// Version currently previewed or confirmed.
    pub fn pending_target(&self) -> Option<VersionId> {
        self.pending.as_ref().map(|p| p.target)
    }

    /// Diff the live document against `target` and enter `Previewing`.
    pub fn preview(
        &mut self,
        live: &SettingsDocument,
        target: &VersionSnapshot,
    ) -> Result<Vec<DiffEntry>, SettingsError> {
        self.ensure_not(RollbackState::Applying, "preview")?;

        let entries = diff::diff(live, &target.settings);
        self.pending = Some(PendingRollback {
            target: target.id,
            base_fingerprint: live.fingerprint(),
        });
        self.state = RollbackState::Previewing;
        Ok(entries)
    }

    pub fn confirm(&mut self) -> Result<(), SettingsError> {
        if self.state != RollbackState::Previewing {
            return Err(self.invalid("confirm"));
        }
        self.state = RollbackState::Confirmed;
        Ok(())
    }

    /// Drop a preview that was not applied.
    pub fn cancel(&mut self) -> Result<(), SettingsError> {
        self.ensure_not(RollbackState::Applying, "cancel")?;
        self.pending = None;
        self.state = RollbackState::Idle;
        Ok(())
    }

    /// Apply the confirmed rollback.
    ///
    /// Takes a safety snapshot of `live`, swaps in the target settings,
    /// appends one `rolled-back` record per changed field and hands every
    /// critical record to `notify`. Fails with `RollbackApply` when the target
    /// snapshot is gone or the live document changed since the preview.
    pub fn apply(
        &mut self,
        live: &mut SettingsDocument,
        store: &mut VersionStore,
        history: &mut ChangeHistoryLog,
        pipeline: &ValidationPipeline,
        actor: Option<&str>,
        mut notify: impl FnMut(&ChangeRecord),
    ) -> Result<RollbackReport, SettingsError> {
        if self.state != RollbackState::Confirmed {
            return Err(self.invalid("apply"));
        }
        let Some(pending) = self.pending.take() else {
            return Err(self.invalid("apply"));
        };
        self.state = RollbackState::Applying;

        let target = match store.get(pending.target) {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => {
                return Err(self.fail(format!(
                    "version {} is no longer available",
                    pending.target
                )))
            }
        };

        let live_fingerprint = live.fingerprint();
        if live_fingerprint != pending.base_fingerprint {
            tracing::warn!(
                version_id = %pending.target,
                previewed = %short_fingerprint(&pending.base_fingerprint),
                live = %short_fingerprint(&live_fingerprint),
                "Stale rollback preview"
            );
            return Err(self.fail(
                "settings changed since the preview; preview again before applying".to_string(),
            ));
        }

        let changes = diff::changes(live, &target.settings);
        if changes.is_empty() {
            tracing::info!(version_id = %target.id, "Rollback target matches live settings");
            self.state = RollbackState::Committed;
            return Ok(RollbackReport {
                target: target.id,
                safety_snapshot: None,
                changes,
                records: Vec::new(),
            });
        }

        let author = actor.unwrap_or("system");
        let safety = store.snapshot(
            live,
            author,
            format!("Before rollback to version {}", target.id),
        );

        let decision = pipeline.decide(ValidationMode::Permissive, &changes, &target.settings);
        let records: Vec<ChangeRecord> = changes
            .iter()
            .map(|entry| {
                let valid = decision.result_for(&entry.category, &entry.key).is_valid;
                ChangeRecord::new(
                    entry.category.clone(),
                    entry.key.clone(),
                    entry.value_before.clone(),
                    entry.value_after.clone(),
                    ChangeAction::RolledBack,
                )
                .with_validity(valid)
                .with_actor(actor.map(str::to_string))
            })
            .collect();

        *live = target.settings.clone();
        history.extend(records.iter().cloned());
        records
            .iter()
            .filter(|r| is_critical(&r.category, &r.field))
            .for_each(&mut notify);

        self.state = RollbackState::Committed;
        tracing::info!(
            version_id = %target.id,
            safety_version_id = %safety.id,
            changes = changes.len(),
            "Rollback committed"
        );

        Ok(RollbackReport {
            target: target.id,
            safety_snapshot: Some(safety),
            changes,
            records,
        })
    }

    fn fail(&mut self, reason: String) -> SettingsError {
        tracing::warn!(reason = %reason, "Rollback failed");
        self.state = RollbackState::Failed;
        SettingsError::RollbackApply(reason)
    }

    fn ensure_not(&self, state: RollbackState, action: &'static str) -> Result<(), SettingsError> {
        if self.state == state {
            Err(self.invalid(action))
        } else {
            Ok(())
        }
    }

    fn invalid(&self, action: &'static str) -> SettingsError {
        SettingsError::InvalidTransition {
            from: self.state,
            action,
        }
    }
}
