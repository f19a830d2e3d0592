//! Parameter catalog: the festival-agnostic metadata fields a nomenclature is
//! assembled from (title, resolution, audio channels, language, ...).
//!
//! Pure logic only. Persistence lives in the `db` crate; callers load rows
//! and convert them into [`Parameter`] values before using anything here.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::formatting::{self, FormatError};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a parameter code.
pub const MAX_CODE_LENGTH: usize = 50;

/// Maximum length of a parameter display name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Values accepted for `bool` parameters (case-insensitive).
pub const BOOL_LITERALS: &[&str] = &["true", "false", "1", "0", "yes", "no"];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Declared value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Int,
    Bool,
    Float,
    Date,
    Json,
}

impl ParameterType {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            "string" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "bool" => Ok(Self::Bool),
            "float" => Ok(Self::Float),
            "date" => Ok(Self::Date),
            "json" => Ok(Self::Json),
            _ => Err(CoreError::Validation(format!(
                "Invalid parameter type '{s}'. Must be one of: string, int, bool, float, date, json"
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Date => "date",
            Self::Json => "json",
        }
    }
}

/// Grouping used by the admin UI and by the analytics reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterCategory {
    Video,
    Audio,
    Accessibility,
    Format,
    Technical,
    Metadata,
    Management,
    Content,
}

impl ParameterCategory {
    pub const ALL: [Self; 8] = [
        Self::Video,
        Self::Audio,
        Self::Accessibility,
        Self::Format,
        Self::Technical,
        Self::Metadata,
        Self::Management,
        Self::Content,
    ];

    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid parameter category '{s}'")))
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Accessibility => "accessibility",
            Self::Format => "format",
            Self::Technical => "technical",
            Self::Metadata => "metadata",
            Self::Management => "management",
            Self::Content => "content",
        }
    }
}

/// Where the value extractor looks for a parameter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionSource {
    /// Read from the analysed DCP package metadata.
    #[serde(rename = "DCP")]
    Dcp,
    #[serde(rename = "metadata")]
    Metadata,
    #[serde(rename = "manual")]
    Manual,
    /// Derived from the movie's own attributes.
    #[serde(rename = "auto")]
    Auto,
}

impl ExtractionSource {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            "DCP" => Ok(Self::Dcp),
            "metadata" => Ok(Self::Metadata),
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            _ => Err(CoreError::Validation(format!(
                "Invalid extraction source '{s}'. Must be one of: DCP, metadata, manual, auto"
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dcp => "DCP",
            Self::Metadata => "metadata",
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter
// ---------------------------------------------------------------------------

/// A named, typed metadata field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: DbId,
    /// Globally unique uppercase identifier, e.g. `AUDIO_LANG`.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub param_type: ParameterType,
    pub category: ParameterCategory,
    pub is_required: bool,
    pub is_active: bool,
    /// System parameters are always available and cannot be toggled by
    /// festival managers.
    pub is_system: bool,
    /// Optional allow-list. Empty means any value.
    #[serde(default)]
    pub possible_values: Vec<String>,
    pub extraction_source: ExtractionSource,
    pub extraction_pattern: Option<String>,
    /// Comma-separated transform names, see [`crate::formatting`].
    pub format_rules: Option<String>,
    pub default_value: Option<String>,
}

impl Parameter {
    /// Whether `format_rules` holds anything other than whitespace.
    pub fn has_format_rules(&self) -> bool {
        self.format_rules
            .as_deref()
            .is_some_and(|rules| !rules.trim().is_empty())
    }

    /// Apply this parameter's `format_rules` to `value`.
    ///
    /// A parameter without rules returns the value unchanged. Malformed rules
    /// are an error; the builder recovers from it with the fallback cleaner.
    pub fn apply_formatting(&self, value: &str) -> Result<String, FormatError> {
        match self.format_rules.as_deref() {
            Some(rules) => formatting::apply_rules(rules, value),
            None => Ok(value.to_string()),
        }
    }

    /// Check a value against the allow-list (case-insensitive).
    pub fn accepts_value(&self, value: &str) -> bool {
        self.possible_values.is_empty()
            || self
                .possible_values
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(value.trim()))
    }

    /// Placeholder used when no value could be extracted.
    pub fn placeholder(&self) -> &str {
        if self.code.is_empty() {
            crate::builder::PLACEHOLDER_CODE
        } else {
            &self.code
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid regex"));

/// Validate a parameter code: uppercase letters, digits and underscores,
/// starting with a letter.
pub fn validate_parameter_code(code: &str) -> Result<(), CoreError> {
    if code.is_empty() {
        return Err(CoreError::Validation(
            "Parameter code must not be empty".to_string(),
        ));
    }
    if code.len() > MAX_CODE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Parameter code exceeds maximum length of {MAX_CODE_LENGTH} characters"
        )));
    }
    if !CODE_RE.is_match(code) {
        return Err(CoreError::Validation(format!(
            "Parameter code '{code}' must be uppercase letters, digits and underscores, \
             starting with a letter"
        )));
    }
    Ok(())
}

/// Check that `value` is a legal literal for `param_type`.
pub fn validate_typed_value(param_type: ParameterType, value: &str) -> Result<(), CoreError> {
    let value = value.trim();
    let ok = match param_type {
        ParameterType::String => true,
        ParameterType::Int => value.parse::<i64>().is_ok(),
        ParameterType::Float => value.parse::<f64>().is_ok(),
        ParameterType::Bool => BOOL_LITERALS
            .iter()
            .any(|literal| literal.eq_ignore_ascii_case(value)),
        ParameterType::Date => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        ParameterType::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Value '{value}' is not a valid {}",
            param_type.as_str()
        )))
    }
}

/// Validate a parameter definition before it is stored.
pub fn validate_parameter(parameter: &Parameter) -> Result<(), CoreError> {
    validate_parameter_code(&parameter.code)?;

    let name = parameter.name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Parameter name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Parameter name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }

    if let Some(rules) = parameter.format_rules.as_deref() {
        formatting::parse_rules(rules).map_err(|e| CoreError::Validation(e.to_string()))?;
    }

    if let Some(default) = parameter.default_value.as_deref() {
        validate_typed_value(parameter.param_type, default)?;
        if !parameter.accepts_value(default) {
            return Err(CoreError::Validation(format!(
                "Default value '{default}' is not one of the possible values for {}",
                parameter.code
            )));
        }
    }

    Ok(())
}

/// A code cannot change once any slot references the parameter.
pub fn ensure_code_change_allowed(
    current: &str,
    proposed: &str,
    referenced: bool,
) -> Result<(), CoreError> {
    if current != proposed && referenced {
        return Err(CoreError::Conflict(format!(
            "Parameter code '{current}' is referenced by nomenclature slots and cannot be renamed"
        )));
    }
    validate_parameter_code(proposed)
}

/// Deletion is blocked while slots still reference the parameter.
pub fn ensure_deletable(parameter: &Parameter, referencing_slots: i64) -> Result<(), CoreError> {
    if referencing_slots > 0 {
        return Err(CoreError::Conflict(format!(
            "Parameter '{}' is used by {referencing_slots} nomenclature slot(s)",
            parameter.code
        )));
    }
    Ok(())
}

/// Only administrators may toggle system parameters.
pub fn ensure_toggle_allowed(parameter: &Parameter, actor_is_admin: bool) -> Result<(), CoreError> {
    if parameter.is_system && !actor_is_admin {
        return Err(CoreError::Validation(format!(
            "System parameter '{}' cannot be deactivated",
            parameter.code
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// In-memory view of the parameter catalog with unique codes.
#[derive(Debug, Clone, Default)]
pub struct ParameterCatalog {
    parameters: Vec<Parameter>,
}

impl ParameterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, rejecting duplicate codes.
    pub fn from_parameters(
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> Result<Self, CoreError> {
        let mut catalog = Self::new();
        for parameter in parameters {
            catalog.insert(parameter)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, parameter: Parameter) -> Result<(), CoreError> {
        if self.by_code(&parameter.code).is_some() {
            return Err(CoreError::Conflict(format!(
                "Parameter code '{}' already exists",
                parameter.code
            )));
        }
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn by_code(&self, code: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.code == code)
    }

    pub fn by_id(&self, id: DbId) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.id == id)
    }

    /// Parameters festival managers may place in a nomenclature.
    pub fn available(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_system || p.is_active)
    }

    pub fn by_category(&self, category: ParameterCategory) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::parameter;
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn enum_round_trip_strings() {
        for t in ["string", "int", "bool", "float", "date", "json"] {
            assert_eq!(ParameterType::from_str_value(t).unwrap().as_str(), t);
        }
        for s in ["DCP", "metadata", "manual", "auto"] {
            assert_eq!(ExtractionSource::from_str_value(s).unwrap().as_str(), s);
        }
        for c in ParameterCategory::ALL {
            assert_eq!(ParameterCategory::from_str_value(c.as_str()).unwrap(), c);
        }
        assert!(ParameterType::from_str_value("decimal").is_err());
        assert!(ExtractionSource::from_str_value("dcp").is_err());
    }

    #[test]
    fn extraction_source_serde_uses_database_spelling() {
        let json = serde_json::to_string(&ExtractionSource::Dcp).unwrap();
        assert_eq!(json, "\"DCP\"");
        let parsed: ExtractionSource = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(parsed, ExtractionSource::Manual);
    }

    #[test]
    fn code_validation() {
        assert!(validate_parameter_code("AUDIO_LANG").is_ok());
        assert!(validate_parameter_code("RES2K").is_ok());
        assert_matches!(validate_parameter_code(""), Err(CoreError::Validation(_)));
        assert_matches!(validate_parameter_code("audio"), Err(CoreError::Validation(_)));
        assert_matches!(validate_parameter_code("2K"), Err(CoreError::Validation(_)));
        assert_matches!(validate_parameter_code("AUDIO-LANG"), Err(CoreError::Validation(_)));
        let long = "A".repeat(MAX_CODE_LENGTH + 1);
        assert_matches!(validate_parameter_code(&long), Err(CoreError::Validation(_)));
    }

    #[test]
    fn typed_values() {
        assert!(validate_typed_value(ParameterType::Int, "2023").is_ok());
        assert!(validate_typed_value(ParameterType::Int, "20.5").is_err());
        assert!(validate_typed_value(ParameterType::Float, "23.976").is_ok());
        assert!(validate_typed_value(ParameterType::Bool, "Yes").is_ok());
        assert!(validate_typed_value(ParameterType::Bool, "maybe").is_err());
        assert!(validate_typed_value(ParameterType::Date, "2024-05-14").is_ok());
        assert!(validate_typed_value(ParameterType::Date, "14/05/2024").is_err());
        assert!(validate_typed_value(ParameterType::Json, r#"{"a":1}"#).is_ok());
        assert!(validate_typed_value(ParameterType::Json, "{a").is_err());
        assert!(validate_typed_value(ParameterType::String, "anything").is_ok());
    }

    #[test]
    fn apply_formatting_without_rules_is_identity() {
        let p = parameter("TITLE", "Title");
        assert_eq!(p.apply_formatting("Le Mépris").unwrap(), "Le Mépris");
        assert!(!p.has_format_rules());
    }

    #[test]
    fn apply_formatting_reports_malformed_rules() {
        let mut p = parameter("TITLE", "Title");
        p.format_rules = Some("caps_lock,bogus".to_string());
        assert_matches!(p.apply_formatting("x"), Err(FormatError::UnknownRule(_)));
    }

    #[test]
    fn blank_rules_are_not_rules() {
        let mut p = parameter("TITLE", "Title");
        p.format_rules = Some("  ".to_string());
        assert!(!p.has_format_rules());
    }

    #[test]
    fn allow_list_is_case_insensitive() {
        let mut p = parameter("RESOLUTION", "Resolution");
        assert!(p.accepts_value("8K"));
        p.possible_values = vec!["2K".to_string(), "4K".to_string()];
        assert!(p.accepts_value("4k"));
        assert!(!p.accepts_value("8K"));
    }

    #[test]
    fn placeholder_falls_back_when_code_missing() {
        let mut p = parameter("FORMAT", "Format");
        assert_eq!(p.placeholder(), "FORMAT");
        p.code.clear();
        assert_eq!(p.placeholder(), "PARAM");
    }

    #[test]
    fn validate_parameter_checks_default_against_type_and_allow_list() {
        let mut p = parameter("YEAR", "Year");
        p.param_type = ParameterType::Int;
        p.default_value = Some("soon".to_string());
        assert_matches!(validate_parameter(&p), Err(CoreError::Validation(_)));

        let mut p = parameter("RESOLUTION", "Resolution");
        p.possible_values = vec!["2K".to_string(), "4K".to_string()];
        p.default_value = Some("8K".to_string());
        assert_matches!(validate_parameter(&p), Err(CoreError::Validation(_)));

        p.default_value = Some("2K".to_string());
        assert!(validate_parameter(&p).is_ok());
    }

    #[test]
    fn validate_parameter_rejects_bad_rules_and_names() {
        let mut p = parameter("TITLE", "  ");
        assert_matches!(validate_parameter(&p), Err(CoreError::Validation(_)));
        p.name = "Title".to_string();
        p.format_rules = Some("wobble".to_string());
        assert_matches!(validate_parameter(&p), Err(CoreError::Validation(msg)) if msg.contains("wobble"));
    }

    #[test]
    fn code_is_immutable_once_referenced() {
        assert_matches!(
            ensure_code_change_allowed("TITLE", "FILM_TITLE", true),
            Err(CoreError::Conflict(_))
        );
        assert!(ensure_code_change_allowed("TITLE", "FILM_TITLE", false).is_ok());
        assert!(ensure_code_change_allowed("TITLE", "TITLE", true).is_ok());
    }

    #[test]
    fn deletion_blocked_while_referenced() {
        let p = parameter("TITLE", "Title");
        assert_matches!(ensure_deletable(&p, 2), Err(CoreError::Conflict(_)));
        assert!(ensure_deletable(&p, 0).is_ok());
    }

    #[test]
    fn system_parameters_need_admin_to_toggle() {
        let mut p = parameter("TITLE", "Title");
        p.is_system = true;
        assert!(ensure_toggle_allowed(&p, false).is_err());
        assert!(ensure_toggle_allowed(&p, true).is_ok());
        p.is_system = false;
        assert!(ensure_toggle_allowed(&p, false).is_ok());
    }

    #[test]
    fn catalog_rejects_duplicate_codes() {
        let result = ParameterCatalog::from_parameters([
            parameter("TITLE", "Title"),
            parameter("TITLE", "Other title"),
        ]);
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn catalog_lists_available_parameters() {
        let mut inactive = parameter("LEGACY", "Legacy");
        inactive.is_active = false;
        let mut system = parameter("TITLE", "Title");
        system.is_system = true;
        system.is_active = false;
        let mut audio = parameter("AUDIO", "Audio");
        audio.id = 7;
        audio.category = ParameterCategory::Audio;

        let catalog = ParameterCatalog::from_parameters([inactive, system, audio]).unwrap();
        let codes: Vec<&str> = catalog.available().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["TITLE", "AUDIO"]);
        assert_eq!(catalog.by_id(7).map(|p| p.code.as_str()), Some("AUDIO"));
        assert_eq!(catalog.by_category(ParameterCategory::Audio).count(), 1);
        assert_eq!(catalog.len(), 3);
    }
}
