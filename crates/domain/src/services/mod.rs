//! Settings engine services.
//!
//! Leaves first: validation and diff are pure; the version store, history
//! log, rollback engine and templates build on them; the controller owns the
//! mutable state and talks to persistence and the notification gate.

pub mod autosave;
pub mod batch;
pub mod change_history;
pub mod controller;
pub mod diff;
pub mod notification;
pub mod persistence;
pub mod rollback;
pub mod templates;
pub mod validation;
pub mod version_store;

pub use autosave::{AutoSaveTask, DEFAULT_QUIET_PERIOD};
pub use batch::{BatchPlan, BatchPreview};
pub use change_history::{ChangeHistoryLog, CHANGE_HISTORY_CAPACITY};
pub use controller::{
    BatchOutcome, ControllerOptions, FieldUpdate, RollbackOutcome, SettingsController,
};
pub use notification::{
    evaluate, is_critical, DispatchResult, GateDecision, MockNotificationDispatcher,
    NotificationDispatcher, NotificationGate, SettingsEvent, SuppressReason, CRITICAL_SETTINGS,
};
pub use persistence::{
    cache_keys, InMemoryCache, InMemoryRemoteApi, LoadSource, LocalCache, Persistence,
    RemoteSettingsApi, SaveStatus,
};
pub use rollback::{RollbackEngine, RollbackReport, RollbackState};
pub use templates::{Template, TemplateCatalog, TemplateSummary};
pub use validation::{Schema, ValidationPipeline, Validator};
pub use version_store::{VersionStore, VERSION_STORE_CAPACITY};
