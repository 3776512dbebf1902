//! Diff models.

use serde::{Deserialize, Serialize};

use super::document::SettingValue;

/// Classification of one (category, key) pair between two documents.
///
/// Variant order is the display order of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Modified,
    Added,
    Removed,
    Unchanged,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Added => write!(f, "added"),
            ChangeType::Removed => write!(f, "removed"),
            ChangeType::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// One entry of a structural diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub category: String,
    pub key: String,
    pub value_before: Option<SettingValue>,
    pub value_after: Option<SettingValue>,
    pub change_type: ChangeType,
}

impl DiffEntry {
    pub fn is_change(&self) -> bool {
        self.change_type != ChangeType::Unchanged
    }
}

/// Per-type entry counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub modified: usize,
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Number of entries that are not `unchanged`.
    pub fn total_changes(&self) -> usize {
        self.modified + self.added + self.removed
    }
}
