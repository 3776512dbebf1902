//! Debounced auto-save of the live document.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::SettingsDocument;
use crate::services::persistence::{Persistence, SaveStatus};

/// Default quiet period before a pending save fires.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(5);

/// Cancellable save scheduled after a quiet period.
///
/// Re-arming aborts the pending task and schedules a new one, so the last
/// mutation decides when the save happens.
pub struct AutoSaveTask {
    quiet_period: Duration,
    pending: Option<JoinHandle<()>>,
    status_tx: watch::Sender<Option<SaveStatus>>,
    status_rx: watch::Receiver<Option<SaveStatus>>,
}

impl AutoSaveTask {
    pub fn new(quiet_period: Duration) -> Self {
        let (status_tx, status_rx) = watch::channel(None);
        Self {
            quiet_period,
            pending: None,
            status_tx,
            status_rx,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Schedule a save of `document`, replacing any pending one.
    pub fn rearm(
        &mut self,
        persistence: Persistence,
        document: SettingsDocument,
        disabled_categories: BTreeSet<String>,
    ) {
        self.cancel();

        let quiet_period = self.quiet_period;
        let status_tx = self.status_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            let status = persistence
                .save_document(&document, &disabled_categories)
                .await;
            match status.warning() {
                None => info!("Auto-save completed"),
                Some(warning) => warn!(warning = %warning, "Auto-save degraded"),
            }
            let _ = status_tx.send(Some(status));
        }));
        debug!(quiet_period_ms = quiet_period.as_millis() as u64, "Auto-save armed");
    }

    /// Drop the pending save, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                handle.abort();
                debug!("Pending auto-save cancelled");
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Status of the most recent completed auto-save.
    pub fn last_status(&self) -> Option<SaveStatus> {
        self.status_rx.borrow().clone()
    }

    /// Receiver notified after each completed auto-save.
    pub fn subscribe(&self) -> watch::Receiver<Option<SaveStatus>> {
        self.status_rx.clone()
    }
}

impl Default for AutoSaveTask {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl Drop for AutoSaveTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
