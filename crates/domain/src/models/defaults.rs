//! Built-in default settings document.

use serde_json::json;

use super::document::SettingsDocument;

/// Settings used when neither the remote API nor the local cache has a document.
pub fn default_settings() -> SettingsDocument {
    let value = json!({
        "system": {
            "siteName": "Operations Platform",
            "siteUrl": "https://ops.example.com",
            "supportEmail": "support@example.com",
            "maxUsers": 500,
            "timezone": "UTC",
            "maintenanceMode": false,
            "debugMode": false,
            "apiRateLimit": 1000,
            "logLevel": "info"
        },
        "security": {
            "twoFactorAuth": false,
            "sessionTimeout": 30,
            "passwordMinLength": 8,
            "passwordMaxLength": 128,
            "maxLoginAttempts": 5,
            "lockoutDuration": 15,
            "ipWhitelist": []
        },
        "notifications": {
            "emailEnabled": true,
            "pushEnabled": true,
            "smsEnabled": false,
            "alertEmail": "alerts@example.com",
            "alertPhone": ""
        },
        "email": {
            "smtpHost": "smtp.example.com",
            "smtpPort": 587,
            "fromAddress": "noreply@example.com",
            "useTls": true
        },
        "maps": {
            "provider": "osm",
            "defaultZoom": 12,
            "defaultCenterLat": 48.1486,
            "defaultCenterLng": 17.1077
        },
        "appearance": {
            "theme": "light",
            "primaryColor": "#1f6feb",
            "accentColor": "#f78166"
        },
        "backup": {
            "autoBackup": true,
            "schedule": "0 2 * * *",
            "retentionDays": 30
        },
        "integrations": {
            "webhookUrl": "",
            "apiDomain": "api.example.com"
        }
    });

    match SettingsDocument::from_value(value) {
        Ok(document) => document,
        Err(_) => SettingsDocument::new(),
    }
}
