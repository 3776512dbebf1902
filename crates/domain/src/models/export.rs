//! Bulk export / import file format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::SettingsDocument;

/// Format version written into export files.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Exported settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub settings: SettingsDocument,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub total_categories: usize,
    pub total_settings: usize,
}

impl ExportFile {
    pub fn from_document(settings: &SettingsDocument) -> Self {
        Self {
            version: EXPORT_FORMAT_VERSION.to_string(),
            export_date: Utc::now(),
            metadata: ExportMetadata {
                total_categories: settings.total_categories(),
                total_settings: settings.total_settings(),
            },
            settings: settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_export_file_shape() {
        let settings = SettingsDocument::from_value(json!({
            "system": {"maxUsers": 500},
            "security": {"twoFactorAuth": true, "sessionTimeout": 30}
        }))
        .unwrap();
        let export = ExportFile::from_document(&settings);
        let json = serde_json::to_value(&export).unwrap();

        assert_eq!(json["version"], json!("1.0"));
        assert!(json["exportDate"].is_string());
        assert_eq!(json["metadata"]["totalCategories"], json!(2));
        assert_eq!(json["metadata"]["totalSettings"], json!(3));
        assert_eq!(json["settings"]["system"]["maxUsers"], json!(500));
    }
}
