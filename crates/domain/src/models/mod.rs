//! Domain models for the settings engine.

pub mod change_record;
pub mod defaults;
pub mod diff;
pub mod document;
pub mod export;
pub mod notification;
pub mod validation;
pub mod version;

pub use change_record::{ChangeAction, ChangeRecord};
pub use defaults::default_settings;
pub use diff::{ChangeType, DiffEntry, DiffSummary};
pub use document::{CategorySettings, SettingValue, SettingsDocument};
pub use export::{ExportFile, ExportMetadata, EXPORT_FORMAT_VERSION};
pub use notification::{NotificationPayload, NotificationPolicy};
pub use validation::{FieldError, ValidationMode, ValidationResult};
pub use version::{VersionId, VersionSnapshot, VersionSummary};
