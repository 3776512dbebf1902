//! Structural diff between two settings documents.
//!
//! Entries are ordered modified, added, removed, unchanged; within a change
//! type by category, then key.

use std::collections::BTreeSet;

use crate::models::document::values_equal;
use crate::models::{ChangeType, DiffEntry, DiffSummary, SettingsDocument};

/// Compute the difference between `before` and `after`.
pub fn diff(before: &SettingsDocument, after: &SettingsDocument) -> Vec<DiffEntry> {
    let categories: BTreeSet<&String> = before
        .categories()
        .map(|(name, _)| name)
        .chain(after.categories().map(|(name, _)| name))
        .collect();

    let mut entries = Vec::new();
    for category in categories {
        let before_fields = before.category(category);
        let after_fields = after.category(category);

        let keys: BTreeSet<&String> = before_fields
            .into_iter()
            .flat_map(|fields| fields.keys())
            .chain(after_fields.into_iter().flat_map(|fields| fields.keys()))
            .collect();

        for key in keys {
            let value_before = before_fields.and_then(|f| f.get(key));
            let value_after = after_fields.and_then(|f| f.get(key));

            let change_type = match (value_before, value_after) {
                (None, Some(_)) => ChangeType::Added,
                (Some(_), None) => ChangeType::Removed,
                (Some(b), Some(a)) if values_equal(b, a) => ChangeType::Unchanged,
                _ => ChangeType::Modified,
            };

            entries.push(DiffEntry {
                category: category.clone(),
                key: key.clone(),
                value_before: value_before.cloned(),
                value_after: value_after.cloned(),
                change_type,
            });
        }
    }

    entries.sort_by(|a, b| {
        a.change_type
            .cmp(&b.change_type)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.key.cmp(&b.key))
    });
    entries
}

/// Only the entries that are not `unchanged`.
pub fn changes(before: &SettingsDocument, after: &SettingsDocument) -> Vec<DiffEntry> {
    diff(before, after)
        .into_iter()
        .filter(DiffEntry::is_change)
        .collect()
}

/// Count entries per change type.
pub fn summarize(entries: &[DiffEntry]) -> DiffSummary {
    entries
        .iter()
        .fold(DiffSummary::default(), |mut summary, entry| {
            match entry.change_type {
                ChangeType::Modified => summary.modified += 1,
                ChangeType::Added => summary.added += 1,
                ChangeType::Removed => summary.removed += 1,
                ChangeType::Unchanged => summary.unchanged += 1,
            }
            summary
        })
}

pub fn has_changes(entries: &[DiffEntry]) -> bool {
    entries.iter().any(DiffEntry::is_change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> SettingsDocument {
        SettingsDocument::from_value(value).unwrap()
    }

    fn doc_a() -> SettingsDocument {
        doc(json!({
            "system": {"maxUsers": 500, "siteName": "Ops", "debugMode": false},
            "security": {"twoFactorAuth": false, "sessionTimeout": 30},
            "email": {"smtp": {"host": "a.example.com", "port": 587}}
        }))
    }

    fn doc_b() -> SettingsDocument {
        doc(json!({
            "system": {"maxUsers": 10000, "siteName": "Ops"},
            "security": {"twoFactorAuth": true, "sessionTimeout": 30, "maxLoginAttempts": 5},
            "maps": {"defaultZoom": 12},
            "email": {"smtp": {"port": 587, "host": "a.example.com"}}
        }))
    }

    #[test]
    fn test_diff_identical_documents_all_unchanged() {
        let a = doc_a();
        let entries = diff(&a, &a);
        assert_eq!(entries.len(), a.total_settings());
        assert!(entries
            .iter()
            .all(|e| e.change_type == ChangeType::Unchanged));
        assert!(!has_changes(&entries));
    }

    #[test]
    fn test_diff_classification() {
        let entries = diff(&doc_a(), &doc_b());
        let find = |category: &str, key: &str| {
            entries
                .iter()
                .find(|e| e.category == category && e.key == key)
                .unwrap()
                .change_type
        };

        assert_eq!(find("system", "maxUsers"), ChangeType::Modified);
        assert_eq!(find("security", "twoFactorAuth"), ChangeType::Modified);
        assert_eq!(find("security", "maxLoginAttempts"), ChangeType::Added);
        assert_eq!(find("maps", "defaultZoom"), ChangeType::Added);
        assert_eq!(find("system", "debugMode"), ChangeType::Removed);
        assert_eq!(find("system", "siteName"), ChangeType::Unchanged);
        // Object leaves compare independent of key order.
        assert_eq!(find("email", "smtp"), ChangeType::Unchanged);
    }

    #[test]
    fn test_diff_ordering_contract() {
        let entries = diff(&doc_a(), &doc_b());
        let order: Vec<(ChangeType, &str, &str)> = entries
            .iter()
            .map(|e| (e.change_type, e.category.as_str(), e.key.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                (ChangeType::Modified, "security", "twoFactorAuth"),
                (ChangeType::Modified, "system", "maxUsers"),
                (ChangeType::Added, "maps", "defaultZoom"),
                (ChangeType::Added, "security", "maxLoginAttempts"),
                (ChangeType::Removed, "system", "debugMode"),
                (ChangeType::Unchanged, "email", "smtp"),
                (ChangeType::Unchanged, "security", "sessionTimeout"),
                (ChangeType::Unchanged, "system", "siteName"),
            ]
        );
    }

    #[test]
    fn test_diff_values_carried() {
        let entries = diff(&doc_a(), &doc_b());
        let max_users = entries.iter().find(|e| e.key == "maxUsers").unwrap();
        assert_eq!(max_users.value_before, Some(json!(500)));
        assert_eq!(max_users.value_after, Some(json!(10000)));

        let removed = entries.iter().find(|e| e.key == "debugMode").unwrap();
        assert_eq!(removed.value_after, None);
    }

    #[test]
    fn test_diff_symmetry() {
        let forward = diff(&doc_a(), &doc_b());
        let backward = diff(&doc_b(), &doc_a());
        let f = summarize(&forward);
        let b = summarize(&backward);

        assert_eq!(f.added, b.removed);
        assert_eq!(f.removed, b.added);
        assert_eq!(f.modified, b.modified);
        assert_eq!(f.unchanged, b.unchanged);

        for entry in &forward {
            let mirror = backward
                .iter()
                .find(|e| e.category == entry.category && e.key == entry.key)
                .unwrap();
            assert_eq!(mirror.value_before, entry.value_after);
            assert_eq!(mirror.value_after, entry.value_before);
            let expected = match entry.change_type {
                ChangeType::Added => ChangeType::Removed,
                ChangeType::Removed => ChangeType::Added,
                other => other,
            };
            assert_eq!(mirror.change_type, expected);
        }
    }

    #[test]
    fn test_diff_empty_documents() {
        let empty = SettingsDocument::new();
        assert!(diff(&empty, &empty).is_empty());

        let entries = diff(&empty, &doc_a());
        assert!(entries.iter().all(|e| e.change_type == ChangeType::Added));
        let entries = diff(&doc_a(), &empty);
        assert!(entries.iter().all(|e| e.change_type == ChangeType::Removed));
    }

    #[test]
    fn test_changes_filters_unchanged() {
        let entries = changes(&doc_a(), &doc_b());
        assert_eq!(entries.len(), 5);
        assert_eq!(summarize(&entries).total_changes(), 5);
    }

    #[test]
    fn test_diff_integral_float_is_unchanged() {
        let before = doc(json!({"system": {"maxUsers": 1, "ratio": 0.5}}));
        let after = doc(json!({"system": {"maxUsers": 1.0, "ratio": 0.5}}));
        let entries = diff(&before, &after);
        assert!(entries
            .iter()
            .all(|e| e.change_type == ChangeType::Unchanged));
    }
}
