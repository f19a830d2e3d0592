//! Models for the `parameters` catalog table.

use dcprism_core::error::CoreError;
use dcprism_core::parameter::{ExtractionSource, Parameter, ParameterCategory, ParameterType};
use dcprism_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `parameters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParameterRow {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub param_type: String,
    pub category: String,
    pub is_required: bool,
    pub is_active: bool,
    pub is_system: bool,
    /// JSON array of allowed values, or `NULL`.
    pub possible_values: Option<serde_json::Value>,
    pub extraction_source: String,
    pub extraction_pattern: Option<String>,
    pub format_rules: Option<String>,
    pub default_value: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ParameterRow> for Parameter {
    type Error = CoreError;

    fn try_from(row: ParameterRow) -> Result<Self, Self::Error> {
        Ok(Parameter {
            id: row.id,
            code: row.code,
            name: row.name,
            description: row.description,
            param_type: ParameterType::from_str_value(&row.param_type)?,
            category: ParameterCategory::from_str_value(&row.category)?,
            is_required: row.is_required,
            is_active: row.is_active,
            is_system: row.is_system,
            possible_values: possible_values_from_json(row.possible_values.as_ref()),
            extraction_source: ExtractionSource::from_str_value(&row.extraction_source)?,
            extraction_pattern: row.extraction_pattern,
            format_rules: row.format_rules,
            default_value: row.default_value,
        })
    }
}

/// Flatten a JSON allow-list into strings. Scalars are stringified, `null`
/// and nested values are dropped.
pub fn possible_values_from_json(value: Option<&serde_json::Value>) -> Vec<String> {
    let Some(serde_json::Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

/// DTO for creating a parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParameter {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub param_type: String,
    pub category: String,
    pub is_required: Option<bool>,
    pub is_active: Option<bool>,
    pub is_system: Option<bool>,
    pub possible_values: Option<Vec<String>>,
    pub extraction_source: String,
    pub extraction_pattern: Option<String>,
    pub format_rules: Option<String>,
    pub default_value: Option<String>,
}

impl CreateParameter {
    /// The parameter this DTO would insert, for validation before the write.
    pub fn to_parameter(&self) -> Result<Parameter, CoreError> {
        Ok(Parameter {
            id: 0,
            code: self.code.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            param_type: ParameterType::from_str_value(&self.param_type)?,
            category: ParameterCategory::from_str_value(&self.category)?,
            is_required: self.is_required.unwrap_or(false),
            is_active: self.is_active.unwrap_or(true),
            is_system: self.is_system.unwrap_or(false),
            possible_values: self.possible_values.clone().unwrap_or_default(),
            extraction_source: ExtractionSource::from_str_value(&self.extraction_source)?,
            extraction_pattern: self.extraction_pattern.clone(),
            format_rules: self.format_rules.clone(),
            default_value: self.default_value.clone(),
        })
    }
}

/// DTO for updating a parameter. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateParameter {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_required: Option<bool>,
    pub is_active: Option<bool>,
    pub possible_values: Option<Vec<String>>,
    pub extraction_source: Option<String>,
    pub extraction_pattern: Option<String>,
    pub format_rules: Option<String>,
    pub default_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn row() -> ParameterRow {
        ParameterRow {
            id: 7,
            code: "AUDIO_LANG".to_string(),
            name: "Audio language".to_string(),
            description: None,
            param_type: "string".to_string(),
            category: "audio".to_string(),
            is_required: false,
            is_active: true,
            is_system: true,
            possible_values: Some(json!(["EN", "FR", 51, null])),
            extraction_source: "DCP".to_string(),
            extraction_pattern: None,
            format_rules: Some("caps_lock".to_string()),
            default_value: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn converts_row() {
        let parameter = Parameter::try_from(row()).unwrap();
        assert_eq!(parameter.id, 7);
        assert_eq!(parameter.category, ParameterCategory::Audio);
        assert_eq!(parameter.extraction_source, ExtractionSource::Dcp);
        assert_eq!(parameter.possible_values, vec!["EN", "FR", "51"]);
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let mut bad = row();
        bad.param_type = "blob".to_string();
        assert_matches!(Parameter::try_from(bad), Err(CoreError::Validation(_)));
    }

    #[test]
    fn non_array_possible_values_are_empty() {
        assert!(possible_values_from_json(Some(&json!({"a": 1}))).is_empty());
        assert!(possible_values_from_json(None).is_empty());
    }

    #[test]
    fn create_dto_applies_defaults() {
        let input = CreateParameter {
            code: "FORMAT".to_string(),
            name: "Format".to_string(),
            description: None,
            param_type: "string".to_string(),
            category: "format".to_string(),
            is_required: None,
            is_active: None,
            is_system: None,
            possible_values: None,
            extraction_source: "metadata".to_string(),
            extraction_pattern: None,
            format_rules: None,
            default_value: None,
        };
        let parameter = input.to_parameter().unwrap();
        assert!(parameter.is_active);
        assert!(!parameter.is_system);
        assert!(parameter.possible_values.is_empty());
    }
}
