//! Settings document model.
//!
//! A document maps category names to field maps. Field values are plain JSON
//! values; nested objects are opaque leaves for diffing but can be addressed
//! with dot-joined field paths (`smtp.host`) when editing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::SettingsError;

/// A single setting value.
pub type SettingValue = Value;

/// Field key to value mapping for one category.
pub type CategorySettings = BTreeMap<String, SettingValue>;

/// Separator used in nested field paths.
pub const FIELD_PATH_SEPARATOR: char = '.';

/// The full settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument {
    categories: BTreeMap<String, CategorySettings>,
}

impl SettingsDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON value.
    ///
    /// The value must be an object whose members are all objects.
    pub fn from_value(value: Value) -> Result<Self, SettingsError> {
        let Value::Object(root) = value else {
            return Err(SettingsError::Structural(
                "settings must be a JSON object".to_string(),
            ));
        };

        let mut categories = BTreeMap::new();
        for (category, fields) in root {
            let Value::Object(fields) = fields else {
                return Err(SettingsError::Structural(format!(
                    "category '{}' must be a JSON object",
                    category
                )));
            };
            categories.insert(category, fields.into_iter().collect());
        }

        Ok(Self { categories })
    }

    /// Convert the document into a JSON value.
    pub fn to_value(&self) -> Value {
        let root: Map<String, Value> = self
            .categories
            .iter()
            .map(|(category, fields)| {
                let fields: Map<String, Value> =
                    fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                (category.clone(), Value::Object(fields))
            })
            .collect();
        Value::Object(root)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Iterate categories in name order.
    pub fn categories(&self) -> impl Iterator<Item = (&String, &CategorySettings)> {
        self.categories.iter()
    }

    pub fn category(&self, category: &str) -> Option<&CategorySettings> {
        self.categories.get(category)
    }

    pub fn total_categories(&self) -> usize {
        self.categories.len()
    }

    /// Number of top-level fields across all categories.
    pub fn total_settings(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn get(&self, category: &str, field: &str) -> Option<&SettingValue> {
        self.categories.get(category)?.get(field)
    }

    /// Look up a value by dot-joined field path.
    pub fn get_path(&self, category: &str, path: &str) -> Option<&SettingValue> {
        let mut segments = path.split(FIELD_PATH_SEPARATOR);
        let first = segments.next()?;
        let mut current = self.get(category, first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Set a top-level field, returning the previous value.
    pub fn set(
        &mut self,
        category: impl Into<String>,
        field: impl Into<String>,
        value: SettingValue,
    ) -> Option<SettingValue> {
        self.categories
            .entry(category.into())
            .or_default()
            .insert(field.into(), value)
    }

    /// Set a value by dot-joined field path, returning the previous value.
    ///
    /// Missing intermediate objects are created. Fails when an intermediate
    /// segment holds a non-object value.
    pub fn set_path(
        &mut self,
        category: &str,
        path: &str,
        value: SettingValue,
    ) -> Result<Option<SettingValue>, SettingsError> {
        let segments: Vec<&str> = path.split(FIELD_PATH_SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(SettingsError::Structural(format!(
                "invalid field path '{}'",
                path
            )));
        }

        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| SettingsError::Structural("empty field path".to_string()))?;
        if parents.is_empty() {
            return Ok(self.set(category, *last, value));
        }

        let fields = self.categories.entry(category.to_string()).or_default();
        let mut current = fields
            .entry(parents[0].to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        for segment in &parents[1..] {
            current = object_mut(current, path)?
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        Ok(object_mut(current, path)?.insert(last.to_string(), value))
    }

    /// Remove a top-level field, returning its value.
    pub fn remove(&mut self, category: &str, field: &str) -> Option<SettingValue> {
        let fields = self.categories.get_mut(category)?;
        let removed = fields.remove(field);
        if fields.is_empty() {
            self.categories.remove(category);
        }
        removed
    }

    /// Overlay a partial document on top of this one.
    pub fn merged_with(&self, partial: &SettingsDocument) -> SettingsDocument {
        let mut merged = self.clone();
        for (category, fields) in &partial.categories {
            let target = merged.categories.entry(category.clone()).or_default();
            for (field, value) in fields {
                target.insert(field.clone(), value.clone());
            }
        }
        merged
    }

    /// Serialize with object keys sorted at every level.
    pub fn canonical_json(&self) -> String {
        canonical_json(&self.to_value())
    }

    /// SHA-256 hex digest of the canonical serialization.
    pub fn fingerprint(&self) -> String {
        shared::crypto::sha256_hex(&self.canonical_json())
    }
}

fn object_mut<'a>(
    value: &'a mut Value,
    path: &str,
) -> Result<&'a mut Map<String, Value>, SettingsError> {
    value.as_object_mut().ok_or_else(|| {
        SettingsError::Structural(format!(
            "field path '{}' crosses a non-object value",
            path
        ))
    })
}

/// Serialize a JSON value with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), canonicalize(&map[k])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => Value::Number(canonical_number(n)),
        other => other.clone(),
    }
}

/// Integral floats compare equal to their integer form (`500.0 == 500`).
fn canonical_number(n: &Number) -> Number {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                return Number::from(f as i64);
            }
        }
    }
    n.clone()
}

/// Structural equality of two setting values via canonical serialization.
pub fn values_equal(a: &SettingValue, b: &SettingValue) -> bool {
    canonical_json(a) == canonical_json(b)
}
