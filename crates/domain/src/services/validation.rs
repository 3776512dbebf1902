//! Validation pipeline for settings fields.
//!
//! Each (category, field) pair is bound to at most one [`Schema`], an ordered
//! list of [`Validator`]s evaluated until the first failure. Unbound pairs are
//! always valid. The same pipeline serves permissive interactive edits and
//! strict batch operations: [`ValidationPipeline::decide`] turns the errors of
//! a set of changes into a [`CommitDecision`] for the given mode.

use std::collections::HashMap;

use serde_json::Value;
use shared::validation::{self as checks, PasswordRules, UrlRules};

use crate::error::SettingsError;
use crate::models::{
    ChangeType, DiffEntry, FieldError, SettingValue, SettingsDocument, ValidationMode,
    ValidationResult,
};

/// A single reusable check.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Rejects null, empty strings and empty lists.
    Required,
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Range {
        min: Option<f64>,
        max: Option<f64>,
        integer_only: bool,
    },
    Email,
    Url(UrlRules),
    Phone,
    Port,
    IpAddress,
    HexColor,
    Timezone,
    Cron,
    Domain,
    PasswordStrength(PasswordRules),
    /// Value must be one of the listed strings.
    OneOf(Vec<String>),
    /// Number must not be below another field of the context document.
    NotLessThan { category: String, field: String },
    /// Applies the inner validator to every element of a list.
    Each(Box<Validator>),
}

impl Validator {
    pub fn range(min: f64, max: f64) -> Self {
        Validator::Range {
            min: Some(min),
            max: Some(max),
            integer_only: false,
        }
    }

    pub fn integer_range(min: i64, max: i64) -> Self {
        Validator::Range {
            min: Some(min as f64),
            max: Some(max as f64),
            integer_only: true,
        }
    }

    pub fn length(min: usize, max: usize) -> Self {
        Validator::Length {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn one_of(options: &[&str]) -> Self {
        Validator::OneOf(options.iter().map(|s| s.to_string()).collect())
    }

    /// Run this check against a value.
    ///
    /// Shape checks accept null and empty strings; pair them with
    /// [`Validator::Required`] to reject those.
    pub fn check(&self, value: &SettingValue, context: &SettingsDocument) -> ValidationResult {
        match self {
            Validator::Required => match value {
                Value::Null => ValidationResult::invalid("This field is required"),
                Value::String(s) if s.trim().is_empty() => {
                    ValidationResult::invalid("This field is required")
                }
                Value::Array(items) if items.is_empty() => {
                    ValidationResult::invalid("This field is required")
                }
                _ => ValidationResult::valid(),
            },
            Validator::Length { min, max } => {
                with_text(value, |s| checks::validate_length(s, *min, *max))
            }
            Validator::Range {
                min,
                max,
                integer_only,
            } => with_number(value, |n| {
                checks::validate_number_range(n, *min, *max, *integer_only)
            }),
            Validator::Email => with_text(value, checks::validate_email_address),
            Validator::Url(rules) => {
                with_text(value, |s| checks::validate_url_address(s, *rules))
            }
            Validator::Phone => with_text(value, checks::validate_phone_e164),
            Validator::Port => with_number(value, checks::validate_port),
            Validator::IpAddress => with_text(value, checks::validate_ip_address),
            Validator::HexColor => with_text(value, checks::validate_hex_color),
            Validator::Timezone => with_text(value, checks::validate_timezone),
            Validator::Cron => with_text(value, checks::validate_cron),
            Validator::Domain => with_text(value, checks::validate_domain),
            Validator::PasswordStrength(rules) => {
                with_text(value, |s| checks::validate_password_strength(s, *rules))
            }
            Validator::OneOf(options) => match value {
                Value::Null => ValidationResult::valid(),
                Value::String(s) if options.iter().any(|o| o == s) => ValidationResult::valid(),
                _ => ValidationResult::invalid(format!("Must be one of: {}", options.join(", "))),
            },
            Validator::NotLessThan { category, field } => {
                let Some(other) = context.get(category, field).and_then(Value::as_f64) else {
                    return ValidationResult::valid();
                };
                match value.as_f64() {
                    Some(n) if n < other => ValidationResult::invalid(format!(
                        "Must not be less than {}.{} ({})",
                        category, field, other
                    )),
                    Some(_) | None => ValidationResult::valid(),
                }
            }
            Validator::Each(inner) => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| inner.check(item, context))
                    .find(|result| !result.is_valid)
                    .unwrap_or_else(ValidationResult::valid),
                Value::Null => ValidationResult::valid(),
                _ => ValidationResult::invalid("Must be a list"),
            },
        }
    }
}

fn with_text(
    value: &SettingValue,
    check: impl Fn(&str) -> Result<(), validator::ValidationError>,
) -> ValidationResult {
    match value {
        Value::Null => ValidationResult::valid(),
        Value::String(s) if s.is_empty() => ValidationResult::valid(),
        Value::String(s) => check(s).map_or_else(ValidationResult::from, |_| {
            ValidationResult::valid()
        }),
        _ => ValidationResult::invalid("Must be text"),
    }
}

fn with_number(
    value: &SettingValue,
    check: impl Fn(f64) -> Result<(), validator::ValidationError>,
) -> ValidationResult {
    match value {
        Value::Null => ValidationResult::valid(),
        Value::Number(n) => match n.as_f64() {
            Some(n) => check(n).map_or_else(ValidationResult::from, |_| {
                ValidationResult::valid()
            }),
            None => ValidationResult::invalid("Must be a number"),
        },
        _ => ValidationResult::invalid("Must be a number"),
    }
}

/// Ordered list of validators; the first failure wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    validators: Vec<Validator>,
}

impl Schema {
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    pub fn validate(&self, value: &SettingValue, context: &SettingsDocument) -> ValidationResult {
        self.validators
            .iter()
            .map(|v| v.check(value, context))
            .find(|result| !result.is_valid)
            .unwrap_or_else(ValidationResult::valid)
    }
}

/// What a validated set of changes may do to the live document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitDecision {
    /// Apply every change. Errors, if any, are recorded against their fields.
    Apply { errors: Vec<FieldError> },
    /// Apply nothing.
    Reject { errors: Vec<FieldError> },
}

impl CommitDecision {
    pub fn errors(&self) -> &[FieldError] {
        match self {
            CommitDecision::Apply { errors } | CommitDecision::Reject { errors } => errors,
        }
    }

    pub fn can_apply(&self) -> bool {
        matches!(self, CommitDecision::Apply { .. })
    }

    /// Verdict for one field of the decision.
    pub fn result_for(&self, category: &str, field: &str) -> ValidationResult {
        self.errors()
            .iter()
            .find(|e| e.category == category && e.field == field)
            .map(|e| ValidationResult::invalid(e.message.clone()))
            .unwrap_or_else(ValidationResult::valid)
    }

    /// Errors of an applicable decision, or `SettingsError::Validation`.
    pub fn into_result(self) -> Result<Vec<FieldError>, SettingsError> {
        match self {
            CommitDecision::Apply { errors } => Ok(errors),
            CommitDecision::Reject { errors } => Err(SettingsError::Validation { errors }),
        }
    }
}

/// Registry of field schemas.
#[derive(Debug, Clone, Default)]
pub struct ValidationPipeline {
    schemas: HashMap<(String, String), Schema>,
}

impl ValidationPipeline {
    /// A pipeline with no bound fields; everything validates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind a schema to a (category, field) pair, replacing any previous one.
    pub fn bind(
        mut self,
        category: impl Into<String>,
        field: impl Into<String>,
        validators: Vec<Validator>,
    ) -> Self {
        self.schemas
            .insert((category.into(), field.into()), Schema::new(validators));
        self
    }

    pub fn schema(&self, category: &str, field: &str) -> Option<&Schema> {
        self.schemas.get(&(category.to_string(), field.to_string()))
    }

    /// Validate one value. `context` is the document the value belongs to.
    pub fn validate(
        &self,
        category: &str,
        field: &str,
        value: &SettingValue,
        context: &SettingsDocument,
    ) -> ValidationResult {
        match self.schema(category, field) {
            Some(schema) => schema.validate(value, context),
            None => ValidationResult::valid(),
        }
    }

    /// Hard-validate every added or modified entry of a diff.
    ///
    /// `candidate` is the document the entries would produce.
    pub fn validate_changes(
        &self,
        entries: &[DiffEntry],
        candidate: &SettingsDocument,
    ) -> Vec<FieldError> {
        entries
            .iter()
            .filter(|e| matches!(e.change_type, ChangeType::Added | ChangeType::Modified))
            .filter_map(|entry| {
                let value = entry.value_after.as_ref()?;
                let result = self.validate(&entry.category, &entry.key, value, candidate);
                result.error.map(|message| FieldError {
                    category: entry.category.clone(),
                    field: entry.key.clone(),
                    message,
                })
            })
            .collect()
    }

    /// Validate `entries` and decide how they may be committed.
    ///
    /// Permissive always applies; strict applies only when nothing failed.
    pub fn decide(
        &self,
        mode: ValidationMode,
        entries: &[DiffEntry],
        candidate: &SettingsDocument,
    ) -> CommitDecision {
        let errors = self.validate_changes(entries, candidate);
        match mode {
            ValidationMode::Permissive => CommitDecision::Apply { errors },
            ValidationMode::Strict if errors.is_empty() => CommitDecision::Apply { errors },
            ValidationMode::Strict => CommitDecision::Reject { errors },
        }
    }

    /// Pipeline with the conventional bindings for the standard categories.
    pub fn with_default_rules() -> Self {
        let secure_url = UrlRules {
            https_only: true,
            forbid_localhost: true,
        };

        Self::empty()
            // system
            .bind(
                "system",
                "siteName",
                vec![Validator::Required, Validator::length(1, 100)],
            )
            .bind(
                "system",
                "siteUrl",
                vec![Validator::Url(UrlRules::default())],
            )
            .bind("system", "supportEmail", vec![Validator::Email])
            .bind("system", "supportPhone", vec![Validator::Phone])
            .bind(
                "system",
                "maxUsers",
                vec![Validator::Required, Validator::integer_range(1, 100_000)],
            )
            .bind(
                "system",
                "timezone",
                vec![Validator::Required, Validator::Timezone],
            )
            .bind(
                "system",
                "apiRateLimit",
                vec![Validator::integer_range(10, 100_000)],
            )
            .bind(
                "system",
                "logLevel",
                vec![Validator::one_of(&["debug", "info", "warn", "error"])],
            )
            // security
            .bind(
                "security",
                "passwordMinLength",
                vec![Validator::Required, Validator::integer_range(6, 128)],
            )
            .bind(
                "security",
                "passwordMaxLength",
                vec![
                    Validator::integer_range(8, 256),
                    Validator::NotLessThan {
                        category: "security".to_string(),
                        field: "passwordMinLength".to_string(),
                    },
                ],
            )
            .bind(
                "security",
                "sessionTimeout",
                vec![Validator::Required, Validator::integer_range(5, 1440)],
            )
            .bind(
                "security",
                "maxLoginAttempts",
                vec![Validator::integer_range(1, 20)],
            )
            .bind(
                "security",
                "lockoutDuration",
                vec![Validator::integer_range(1, 1440)],
            )
            .bind(
                "security",
                "ipWhitelist",
                vec![Validator::Each(Box::new(Validator::IpAddress))],
            )
            .bind(
                "security",
                "adminPassword",
                vec![Validator::PasswordStrength(PasswordRules {
                    min_length: 12,
                    require_special: true,
                    ..PasswordRules::default()
                })],
            )
            // notifications
            .bind("notifications", "alertEmail", vec![Validator::Email])
            .bind("notifications", "alertPhone", vec![Validator::Phone])
            .bind(
                "notifications",
                "webhookUrl",
                vec![Validator::Url(secure_url)],
            )
            // email
            .bind("email", "smtpHost", vec![Validator::Domain])
            .bind("email", "smtpPort", vec![Validator::Port])
            .bind("email", "fromAddress", vec![Validator::Email])
            // maps
            .bind("maps", "defaultZoom", vec![Validator::integer_range(1, 20)])
            .bind(
                "maps",
                "defaultCenterLat",
                vec![Validator::range(-90.0, 90.0)],
            )
            .bind(
                "maps",
                "defaultCenterLng",
                vec![Validator::range(-180.0, 180.0)],
            )
            // appearance
            .bind("appearance", "primaryColor", vec![Validator::HexColor])
            .bind("appearance", "accentColor", vec![Validator::HexColor])
            .bind(
                "appearance",
                "theme",
                vec![Validator::one_of(&["light", "dark", "system"])],
            )
            // backup
            .bind("backup", "schedule", vec![Validator::Cron])
            .bind(
                "backup",
                "retentionDays",
                vec![Validator::integer_range(1, 365)],
            )
            // integrations
            .bind(
                "integrations",
                "webhookUrl",
                vec![Validator::Url(secure_url)],
            )
            .bind("integrations", "apiDomain", vec![Validator::Domain])
            .bind(
                "integrations",
                "allowedOrigins",
                vec![Validator::Each(Box::new(Validator::Url(UrlRules::default())))],
            )
    }
}
