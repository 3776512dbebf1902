//! Version snapshot models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::SettingsDocument;

/// Time-based, strictly increasing snapshot identifier (Unix milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub i64);

impl VersionId {
    /// Next identifier after `previous`, based on the given clock reading.
    ///
    /// Falls back to `previous + 1` when the clock has not advanced.
    pub fn next(now: DateTime<Utc>, previous: Option<VersionId>) -> Self {
        let millis = now.timestamp_millis();
        match previous {
            Some(VersionId(prev)) if millis <= prev => VersionId(prev + 1),
            _ => VersionId(millis),
        }
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VersionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(VersionId)
    }
}

/// An immutable copy of the settings document plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub id: VersionId,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub description: String,
    pub settings: SettingsDocument,
}

/// Snapshot listing entry without the settings payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: VersionId,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub description: String,
    pub total_settings: usize,
}

impl From<&VersionSnapshot> for VersionSummary {
    fn from(snapshot: &VersionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            timestamp: snapshot.timestamp,
            author: snapshot.author.clone(),
            description: snapshot.description.clone(),
            total_settings: snapshot.settings.total_settings(),
        }
    }
}
