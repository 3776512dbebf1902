//! File-backed local fallback cache.
//!
//! Each key is stored as `<dir>/<key>.json`. Writes go to a temporary file
//! first and are renamed into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use domain::services::LocalCache;
use domain::PersistenceError;
use serde_json::Value;
use tracing::debug;

/// JSON files in a single directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `dir`, creating it when missing.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| local_error(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            && !key.starts_with('.');
        if !valid {
            return Err(PersistenceError::Local(format!("invalid cache key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn local_error(path: &Path, err: std::io::Error) -> PersistenceError {
    PersistenceError::Local(format!("{}: {}", path.display(), err))
}

#[async_trait::async_trait]
impl LocalCache for FileCache {
    async fn read(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(local_error(&path, e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&value)?;

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| local_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| local_error(&path, e))?;

        debug!(key = %key, bytes = bytes.len(), "Cache entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::SettingsDocument;
    use domain::services::{cache_keys, Persistence, InMemoryRemoteApi, LoadSource};
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();
        assert_eq!(cache.read(cache_keys::DOCUMENT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path().join("nested")).await.unwrap();

        let value = json!({"system": {"maxUsers": 500}});
        assert_ok!(cache.write(cache_keys::DOCUMENT, value.clone()).await);
        assert_eq!(cache.read(cache_keys::DOCUMENT).await.unwrap(), Some(value));
        assert!(cache.dir().join("settings.document.json").exists());
        assert!(!cache.dir().join("settings.document.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();

        assert_ok!(cache.write("settings.versions", json!([1])).await);
        assert_ok!(cache.write("settings.versions", json!([1, 2])).await);
        assert_eq!(
            cache.read("settings.versions").await.unwrap(),
            Some(json!([1, 2]))
        );
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();

        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(
                cache.write(key, json!(1)).await,
                Err(PersistenceError::Local(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("settings.document.json"), b"{not json")
            .await
            .unwrap();

        assert!(matches!(
            cache.read(cache_keys::DOCUMENT).await,
            Err(PersistenceError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_serves_as_fallback_for_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FileCache::open(dir.path()).await.unwrap());
        let remote = Arc::new(InMemoryRemoteApi::new());
        remote.set_failing(true);
        let persistence = Persistence::new(remote, cache);

        let document =
            SettingsDocument::from_value(json!({"maps": {"defaultZoom": 12}})).unwrap();
        persistence.save_document(&document, &BTreeSet::new()).await;

        let (loaded, source) = persistence.load_document().await.unwrap();
        assert_eq!(loaded, document);
        assert_eq!(source, LoadSource::Local);
    }
}
