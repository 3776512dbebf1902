//! Domain layer of the settings administration backend.
//!
//! This crate contains:
//! - The settings document model, snapshots, change records and diffs
//! - The engine services: diff, validation pipeline, version store,
//!   change history, rollback, templates, notification gate
//! - Persistence collaborator traits and the settings controller
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{PersistenceError, SettingsError};
