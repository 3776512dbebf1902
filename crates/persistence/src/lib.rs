//! Persistence layer for the settings administration backend.
//!
//! This crate contains:
//! - The HTTP client for the remote settings API
//! - The HTTP notification dispatcher
//! - The file-backed local fallback cache
//! - Remote call metrics

pub mod local_cache;
pub mod metrics;
pub mod remote;

pub use local_cache::FileCache;
pub use remote::{HttpNotificationDispatcher, HttpSettingsApi, RemoteConfig};
