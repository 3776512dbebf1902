//! Persistence collaborators for the settings controller.
//!
//! The remote API is the source of truth; the local cache is an independent
//! fallback. Neither can fail an in-memory operation: every write reports a
//! [`SaveStatus`] and every read degrades to the next source.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::PersistenceError;
use crate::models::{SettingsDocument, VersionId, VersionSnapshot};
use crate::services::version_store::VERSION_STORE_CAPACITY;

/// Keys used in the local cache.
pub mod cache_keys {
    pub const DOCUMENT: &str = "settings.document";
    pub const DISABLED_CATEGORIES: &str = "settings.disabledCategories";
    pub const VERSIONS: &str = "settings.versions";
    pub const NOTIFICATION_POLICY: &str = "settings.notificationPolicy";
}

/// Remote settings and version endpoints.
#[async_trait::async_trait]
pub trait RemoteSettingsApi: Send + Sync {
    async fn fetch_settings(&self) -> Result<SettingsDocument, PersistenceError>;

    async fn store_settings(&self, document: &SettingsDocument) -> Result<(), PersistenceError>;

    async fn fetch_versions(&self) -> Result<Vec<VersionSnapshot>, PersistenceError>;

    async fn store_version(&self, snapshot: &VersionSnapshot) -> Result<(), PersistenceError>;

    async fn delete_version(&self, id: VersionId) -> Result<(), PersistenceError>;

    /// Audit-only notice that a rollback to `id` happened.
    async fn record_rollback(&self, id: VersionId) -> Result<(), PersistenceError>;
}

/// Key-value fallback store.
#[async_trait::async_trait]
pub trait LocalCache: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError>;

    async fn write(&self, key: &str, value: Value) -> Result<(), PersistenceError>;
}

/// Outcome of a persistence attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SaveStatus {
    Synced,
    SavedLocallyOnly { warning: String },
    Failed { warning: String },
}

impl SaveStatus {
    pub fn warning(&self) -> Option<&str> {
        match self {
            SaveStatus::Synced => None,
            SaveStatus::SavedLocallyOnly { warning } | SaveStatus::Failed { warning } => {
                Some(warning.as_str())
            }
        }
    }

    fn from_results(
        remote: Result<(), PersistenceError>,
        local: Result<(), PersistenceError>,
    ) -> Self {
        match (remote, local) {
            (Ok(()), Ok(())) => SaveStatus::Synced,
            (Ok(()), Err(local)) => {
                tracing::warn!(error = %local, "Local cache write failed");
                SaveStatus::Synced
            }
            (Err(remote), Ok(())) => {
                tracing::warn!(error = %remote, "Remote write failed, saved locally only");
                SaveStatus::SavedLocallyOnly {
                    warning: remote.to_string(),
                }
            }
            (Err(remote), Err(local)) => {
                tracing::warn!(remote = %remote, local = %local, "Remote and local writes failed");
                SaveStatus::Failed {
                    warning: format!("{}; {}", remote, local),
                }
            }
        }
    }
}

/// Where a loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Remote,
    Local,
    Defaults,
}

/// Remote and local collaborators used together.
#[derive(Clone)]
pub struct Persistence {
    remote: Arc<dyn RemoteSettingsApi>,
    local: Arc<dyn LocalCache>,
}

impl Persistence {
    pub fn new(remote: Arc<dyn RemoteSettingsApi>, local: Arc<dyn LocalCache>) -> Self {
        Self { remote, local }
    }

    /// In-memory collaborators, returned alongside for inspection.
    pub fn in_memory() -> (Self, Arc<InMemoryRemoteApi>, Arc<InMemoryCache>) {
        let remote = Arc::new(InMemoryRemoteApi::new());
        let local = Arc::new(InMemoryCache::new());
        (Self::new(remote.clone(), local.clone()), remote, local)
    }

    pub fn local(&self) -> Arc<dyn LocalCache> {
        self.local.clone()
    }

    /// Write the live document and disabled categories.
    pub async fn save_document(
        &self,
        document: &SettingsDocument,
        disabled_categories: &BTreeSet<String>,
    ) -> SaveStatus {
        let local = self.cache_document(document, disabled_categories).await;
        let remote = self.remote.store_settings(document).await;
        SaveStatus::from_results(remote, local)
    }

    /// Write the disabled categories to the local cache only.
    pub async fn save_disabled_categories(
        &self,
        disabled_categories: &BTreeSet<String>,
    ) -> Result<(), PersistenceError> {
        let value = serde_json::to_value(disabled_categories)?;
        self.local
            .write(cache_keys::DISABLED_CATEGORIES, value)
            .await
    }

    async fn cache_document(
        &self,
        document: &SettingsDocument,
        disabled_categories: &BTreeSet<String>,
    ) -> Result<(), PersistenceError> {
        self.local
            .write(cache_keys::DOCUMENT, document.to_value())
            .await?;
        self.save_disabled_categories(disabled_categories).await
    }

    /// Persist a new snapshot remotely and the retained history locally.
    pub async fn save_version(
        &self,
        snapshot: &VersionSnapshot,
        retained: &[VersionSnapshot],
    ) -> SaveStatus {
        let local = self.cache_versions(retained).await;
        let remote = self.remote.store_version(snapshot).await;
        SaveStatus::from_results(remote, local)
    }

    pub async fn delete_version(&self, id: VersionId, retained: &[VersionSnapshot]) -> SaveStatus {
        let local = self.cache_versions(retained).await;
        let remote = self.remote.delete_version(id).await;
        SaveStatus::from_results(remote, local)
    }

    async fn cache_versions(&self, retained: &[VersionSnapshot]) -> Result<(), PersistenceError> {
        let kept: Vec<&VersionSnapshot> = retained.iter().take(VERSION_STORE_CAPACITY).collect();
        let value = serde_json::to_value(kept)?;
        self.local.write(cache_keys::VERSIONS, value).await
    }

    /// Send the rollback audit call. Returns a warning on failure.
    pub async fn record_rollback(&self, id: VersionId) -> Option<String> {
        match self.remote.record_rollback(id).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(version_id = %id, error = %e, "Rollback audit call failed");
                Some(e.to_string())
            }
        }
    }

    /// Load the document from the remote API, then the local cache.
    pub async fn load_document(&self) -> Option<(SettingsDocument, LoadSource)> {
        match self.remote.fetch_settings().await {
            Ok(document) => return Some((document, LoadSource::Remote)),
            Err(e) => tracing::warn!(error = %e, "Remote settings unavailable, trying local cache"),
        }

        match self.read_local::<Value>(cache_keys::DOCUMENT).await {
            Some(value) => match SettingsDocument::from_value(value) {
                Ok(document) => Some((document, LoadSource::Local)),
                Err(e) => {
                    tracing::warn!(error = %e, "Cached settings document is malformed");
                    None
                }
            },
            None => None,
        }
    }

    pub async fn load_disabled_categories(&self) -> BTreeSet<String> {
        self.read_local(cache_keys::DISABLED_CATEGORIES)
            .await
            .unwrap_or_default()
    }

    /// Load version history from the remote API, then the local cache.
    pub async fn load_versions(&self) -> Vec<VersionSnapshot> {
        match self.remote.fetch_versions().await {
            Ok(versions) => versions,
            Err(e) => {
                tracing::warn!(error = %e, "Remote versions unavailable, trying local cache");
                self.read_local(cache_keys::VERSIONS)
                    .await
                    .unwrap_or_default()
            }
        }
    }

    async fn read_local<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.local.read(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Ignoring malformed cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Local cache read failed");
                None
            }
        }
    }
}

#[derive(Debug, Default)]
struct RemoteState {
    settings: Option<SettingsDocument>,
    versions: Vec<VersionSnapshot>,
    rollbacks: Vec<VersionId>,
}

/// Remote API kept in memory, for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryRemoteApi {
    state: Mutex<RemoteState>,
    failing: AtomicBool,
}

impl InMemoryRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a remote error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn settings(&self) -> Option<SettingsDocument> {
        self.state.lock().await.settings.clone()
    }

    pub async fn versions(&self) -> Vec<VersionSnapshot> {
        self.state.lock().await.versions.clone()
    }

    pub async fn rollbacks(&self) -> Vec<VersionId> {
        self.state.lock().await.rollbacks.clone()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::Remote("service unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl RemoteSettingsApi for InMemoryRemoteApi {
    async fn fetch_settings(&self) -> Result<SettingsDocument, PersistenceError> {
        self.check()?;
        self.state
            .lock()
            .await
            .settings
            .clone()
            .ok_or_else(|| PersistenceError::Remote("no settings stored".to_string()))
    }

    async fn store_settings(&self, document: &SettingsDocument) -> Result<(), PersistenceError> {
        self.check()?;
        self.state.lock().await.settings = Some(document.clone());
        Ok(())
    }

    async fn fetch_versions(&self) -> Result<Vec<VersionSnapshot>, PersistenceError> {
        self.check()?;
        Ok(self.state.lock().await.versions.clone())
    }

    async fn store_version(&self, snapshot: &VersionSnapshot) -> Result<(), PersistenceError> {
        self.check()?;
        self.state.lock().await.versions.push(snapshot.clone());
        Ok(())
    }

    async fn delete_version(&self, id: VersionId) -> Result<(), PersistenceError> {
        self.check()?;
        self.state.lock().await.versions.retain(|v| v.id != id);
        Ok(())
    }

    async fn record_rollback(&self, id: VersionId) -> Result<(), PersistenceError> {
        self.check()?;
        self.state.lock().await.rollbacks.push(id);
        Ok(())
    }
}

/// Local cache kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Value>>,
    failing: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::Local("storage unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl LocalCache for InMemoryCache {
    async fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        self.check()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), PersistenceError> {
        self.check()?;
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}
