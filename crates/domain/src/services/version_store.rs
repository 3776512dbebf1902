//! Bounded, newest-first store of settings snapshots.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::error::SettingsError;
use crate::models::{SettingsDocument, VersionId, VersionSnapshot};

/// Maximum number of snapshots kept.
pub const VERSION_STORE_CAPACITY: usize = 10;

/// Ordered snapshot history. Index 0 is the newest entry.
#[derive(Debug, Clone)]
pub struct VersionStore {
    snapshots: VecDeque<VersionSnapshot>,
    capacity: usize,
    last_id: Option<VersionId>,
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionStore {
    pub fn new() -> Self {
        Self::with_capacity(VERSION_STORE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            last_id: None,
        }
    }

    /// Copy `document` into a new snapshot at the head of the store.
    ///
    /// Evicts the oldest snapshot once the store is over capacity.
    pub fn snapshot(
        &mut self,
        document: &SettingsDocument,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> VersionSnapshot {
        self.snapshot_at(Utc::now(), document, author, description)
    }

    fn snapshot_at(
        &mut self,
        now: DateTime<Utc>,
        document: &SettingsDocument,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> VersionSnapshot {
        let id = VersionId::next(now, self.last_id);
        self.last_id = Some(id);

        let snapshot = VersionSnapshot {
            id,
            timestamp: now,
            author: author.into(),
            description: description.into(),
            settings: document.clone(),
        };

        self.snapshots.push_front(snapshot.clone());
        while self.snapshots.len() > self.capacity {
            if let Some(evicted) = self.snapshots.pop_back() {
                tracing::debug!(version_id = %evicted.id, "Evicted oldest settings snapshot");
            }
        }

        snapshot
    }

    /// Snapshots, newest first.
    pub fn list(&self) -> impl Iterator<Item = &VersionSnapshot> {
        self.snapshots.iter()
    }

    pub fn to_vec(&self) -> Vec<VersionSnapshot> {
        self.snapshots.iter().cloned().collect()
    }

    pub fn get(&self, id: VersionId) -> Result<&VersionSnapshot, SettingsError> {
        self.snapshots
            .iter()
            .find(|s| s.id == id)
            .ok_or(SettingsError::VersionNotFound(id))
    }

    pub fn head(&self) -> Option<&VersionSnapshot> {
        self.snapshots.front()
    }

    /// Remove one snapshot. Remaining ids are left as they are.
    pub fn delete(&mut self, id: VersionId) -> Result<VersionSnapshot, SettingsError> {
        let index = self
            .snapshots
            .iter()
            .position(|s| s.id == id)
            .ok_or(SettingsError::VersionNotFound(id))?;
        self.snapshots
            .remove(index)
            .ok_or(SettingsError::VersionNotFound(id))
    }

    /// Replace the contents with persisted history.
    ///
    /// Input order does not matter; the newest `capacity` snapshots are kept.
    pub fn restore(&mut self, mut snapshots: Vec<VersionSnapshot>) {
        snapshots.sort_by(|a, b| b.id.cmp(&a.id));
        snapshots.dedup_by_key(|s| s.id);
        snapshots.truncate(self.capacity);

        self.last_id = snapshots.first().map(|s| s.id).max(self.last_id);
        self.snapshots = snapshots.into();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(max_users: i64) -> SettingsDocument {
        let mut doc = SettingsDocument::new();
        doc.set("system", "maxUsers", json!(max_users));
        doc
    }

    #[test]
    fn test_snapshot_inserts_at_head() {
        let mut store = VersionStore::new();
        let first = store.snapshot(&doc(1), "admin", "first");
        let second = store.snapshot(&doc(2), "admin", "second");

        assert!(second.id > first.id);
        assert_eq!(store.head().unwrap().id, second.id);
        let ids: Vec<VersionId> = store.list().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_store_never_exceeds_capacity() {
        let mut store = VersionStore::new();
        let first = store.snapshot(&doc(0), "admin", "snapshot 0");
        for i in 1..=10 {
            store.snapshot(&doc(i), "admin", format!("snapshot {}", i));
            assert!(store.len() <= VERSION_STORE_CAPACITY);
        }

        assert_eq!(store.len(), 10);
        assert!(store.list().all(|s| s.id != first.id));
        assert!(matches!(
            store.get(first.id),
            Err(SettingsError::VersionNotFound(_))
        ));
        assert_eq!(store.list().last().unwrap().description, "snapshot 1");
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut store = VersionStore::new();
        let mut live = doc(500);
        let snapshot = store.snapshot(&live, "admin", "before");
        live.set("system", "maxUsers", json!(10000));

        assert_eq!(
            store.get(snapshot.id).unwrap().settings.get("system", "maxUsers"),
            Some(&json!(500))
        );
    }

    #[test]
    fn test_ids_increase_within_same_millisecond() {
        let mut store = VersionStore::new();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let a = store.snapshot_at(now, &doc(1), "admin", "a");
        let b = store.snapshot_at(now, &doc(2), "admin", "b");
        assert_eq!(b.id, VersionId(a.id.0 + 1));
    }

    #[test]
    fn test_delete_head_keeps_other_ids() {
        let mut store = VersionStore::new();
        let first = store.snapshot(&doc(1), "admin", "first");
        let second = store.snapshot(&doc(2), "admin", "second");

        let removed = store.delete(second.id).unwrap();
        assert_eq!(removed.id, second.id);
        assert_eq!(store.head().unwrap().id, first.id);

        let third = store.snapshot(&doc(3), "admin", "third");
        assert!(third.id > second.id);
    }

    #[test]
    fn test_delete_unknown_version() {
        let mut store = VersionStore::new();
        let err = store.delete(VersionId(7)).unwrap_err();
        assert_eq!(err.to_string(), "Version not found: 7");
    }

    #[test]
    fn test_restore_sorts_and_truncates() {
        let mut source = VersionStore::with_capacity(20);
        for i in 0..12 {
            source.snapshot(&doc(i), "admin", format!("v{}", i));
        }
        let mut persisted = source.to_vec();
        persisted.reverse();

        let mut store = VersionStore::new();
        store.restore(persisted);

        assert_eq!(store.len(), 10);
        assert_eq!(store.head().unwrap().description, "v11");
        assert_eq!(store.list().last().unwrap().description, "v2");

        let next = store.snapshot(&doc(99), "admin", "after restore");
        assert_eq!(store.head().unwrap().id, next.id);
        assert!(next.id > store.list().nth(1).unwrap().id);
    }
}
