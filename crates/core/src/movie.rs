//! The external entities the engine reads from: movies and festivals.
//!
//! Both are owned by the surrounding application. The engine only needs an
//! identifier, a title, and a bag of attribute values to extract from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DbId;

/// A film submission as seen by the nomenclature engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: DbId,
    pub title: String,
    /// Movie columns and free-form metadata (`year`, `format`, `duration`, ...).
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
    /// Stored parameter values keyed by parameter code, filled by DCP
    /// analysis or manual entry.
    #[serde(default)]
    pub parameter_values: HashMap<String, String>,
}

impl Movie {
    pub fn new(id: DbId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to set an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style helper to set a stored parameter value.
    pub fn with_parameter_value(mut self, code: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter_values.insert(code.into(), value.into());
        self
    }

    /// Read an attribute as text. `title` falls back to the title field.
    ///
    /// Null, blank strings, arrays and objects are treated as absent.
    pub fn attribute(&self, key: &str) -> Option<String> {
        match self.attributes.get(key) {
            Some(value) => value_to_text(value),
            None if key == "title" => non_blank(&self.title),
            None => None,
        }
    }

    /// Stored parameter value for `code`, if non-blank.
    pub fn parameter_value(&self, code: &str) -> Option<String> {
        self.parameter_values.get(code).and_then(|v| non_blank(v))
    }
}

/// A festival scoping a set of nomenclature slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Festival {
    pub id: DbId,
    pub name: String,
}

impl Festival {
    pub fn new(id: DbId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn non_blank(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
