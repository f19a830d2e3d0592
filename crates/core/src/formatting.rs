//! Parameter value formatting.
//!
//! Two layers, applied outer to inner:
//!
//! 1. The parameter's own `format_rules`, a comma-separated list of named
//!    transforms (`no_spacing,caps_lock`, `truncate:8`, ...), applied by a
//!    [`Formatter`].
//! 2. The [`basic_clean`] fallback, which always yields a legal filename
//!    token. [`FallbackFormatter`] runs it whenever a parameter has no rules
//!    or its rules fail to apply.

use unicode_normalization::char::{decompose_canonical, is_combining_mark};

use crate::parameter::Parameter;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Token emitted by the fallback cleaner when nothing legal survives.
pub const CLEAN_SENTINEL: &str = "CLEAN";

/// Rule names accepted in `format_rules`.
pub const KNOWN_RULES: &[&str] = &[
    "trim",
    "no_spacing",
    "caps_lock",
    "uppercase",
    "lowercase",
    "camel_case",
    "pascal_case",
    "snake_case",
    "ascii",
    "alphanumeric",
    "truncate",
    "pad_left",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to parse or apply a parameter's `format_rules`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Unknown format rule '{0}'")]
    UnknownRule(String),

    #[error("Invalid argument for format rule '{rule}': {message}")]
    InvalidArgument { rule: String, message: String },
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A single named transform from a `format_rules` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    Trim,
    NoSpacing,
    Uppercase,
    Lowercase,
    CamelCase,
    PascalCase,
    SnakeCase,
    Ascii,
    Alphanumeric,
    /// Keep at most N characters.
    Truncate(usize),
    /// Left-pad with `0` up to N characters.
    PadLeft(usize),
}

impl FormatRule {
    /// Parse one token such as `caps_lock` or `truncate:12`.
    pub fn parse(token: &str) -> Result<Self, FormatError> {
        let (name, arg) = match token.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (token.trim(), None),
        };
        let name = name.to_ascii_lowercase();

        let simple = match name.as_str() {
            "trim" => Some(Self::Trim),
            "no_spacing" => Some(Self::NoSpacing),
            "caps_lock" | "uppercase" => Some(Self::Uppercase),
            "lowercase" => Some(Self::Lowercase),
            "camel_case" => Some(Self::CamelCase),
            "pascal_case" => Some(Self::PascalCase),
            "snake_case" => Some(Self::SnakeCase),
            "ascii" => Some(Self::Ascii),
            "alphanumeric" => Some(Self::Alphanumeric),
            _ => None,
        };

        if let Some(rule) = simple {
            return match arg {
                None => Ok(rule),
                Some(_) => Err(FormatError::InvalidArgument {
                    rule: name,
                    message: "rule takes no argument".to_string(),
                }),
            };
        }

        match name.as_str() {
            "truncate" => Ok(Self::Truncate(parse_width(&name, arg)?)),
            "pad_left" => Ok(Self::PadLeft(parse_width(&name, arg)?)),
            _ => Err(FormatError::UnknownRule(name)),
        }
    }

    /// Apply this transform to `value`.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::NoSpacing => value.chars().filter(|c| !c.is_whitespace()).collect(),
            Self::Uppercase => value.to_uppercase(),
            Self::Lowercase => value.to_lowercase(),
            Self::CamelCase => words(value)
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
                .collect(),
            Self::PascalCase => words(value).map(capitalize).collect(),
            Self::SnakeCase => words(value)
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join("_"),
            Self::Ascii => transliterate(value),
            Self::Alphanumeric => value.chars().filter(char::is_ascii_alphanumeric).collect(),
            Self::Truncate(max) => value.chars().take(*max).collect(),
            Self::PadLeft(width) => {
                let len = value.chars().count();
                if len >= *width {
                    value.to_string()
                } else {
                    format!("{}{value}", "0".repeat(width - len))
                }
            }
        }
    }
}

fn parse_width(rule: &str, arg: Option<&str>) -> Result<usize, FormatError> {
    let arg = arg.ok_or_else(|| FormatError::InvalidArgument {
        rule: rule.to_string(),
        message: "a numeric width is required".to_string(),
    })?;
    match arg.parse::<usize>() {
        Ok(width) if width > 0 => Ok(width),
        _ => Err(FormatError::InvalidArgument {
            rule: rule.to_string(),
            message: format!("'{arg}' is not a positive integer"),
        }),
    }
}

fn words(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Parse a full `format_rules` string. Empty tokens are ignored.
pub fn parse_rules(rules: &str) -> Result<Vec<FormatRule>, FormatError> {
    rules
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(FormatRule::parse)
        .collect()
}

/// Parse and apply a `format_rules` string, left to right.
pub fn apply_rules(rules: &str, value: &str) -> Result<String, FormatError> {
    let parsed = parse_rules(rules)?;
    Ok(parsed
        .iter()
        .fold(value.to_string(), |acc, rule| rule.apply(&acc)))
}

// ---------------------------------------------------------------------------
// Fallback cleaner
// ---------------------------------------------------------------------------

/// Replace accented and ligature characters with ASCII approximations.
///
/// Characters with no ASCII decomposition are kept as-is; callers that need
/// a strict token should filter afterwards.
pub fn transliterate(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("TH"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'đ' | 'ð' => out.push('d'),
            'Đ' | 'Ð' => out.push('D'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            _ => decompose_canonical(c, |d| {
                if !is_combining_mark(d) {
                    out.push(d);
                }
            }),
        }
    }
    out
}

/// The guaranteed-legal token path: strip whitespace, transliterate to
/// ASCII, drop everything outside `[A-Za-z0-9_]`.
///
/// Returns [`CLEAN_SENTINEL`] when nothing survives.
pub fn basic_clean(value: &str) -> String {
    let no_spaces: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned: String = transliterate(&no_spaces)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if cleaned.is_empty() {
        CLEAN_SENTINEL.to_string()
    } else {
        cleaned
    }
}

// ---------------------------------------------------------------------------
// Formatter capability
// ---------------------------------------------------------------------------

/// Formats a raw parameter value according to the parameter's definition.
pub trait Formatter: Send + Sync {
    fn format(&self, parameter: &Parameter, value: &str) -> Result<String, FormatError>;
}

/// Returns the value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, _parameter: &Parameter, value: &str) -> Result<String, FormatError> {
        Ok(value.to_string())
    }
}

/// Applies the parameter's `format_rules`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleFormatter;

impl Formatter for RuleFormatter {
    fn format(&self, parameter: &Parameter, value: &str) -> Result<String, FormatError> {
        parameter.apply_formatting(value)
    }
}

/// Wraps a [`Formatter`] with the [`basic_clean`] safety net.
///
/// Parameters without `format_rules` go straight to the cleaner. When the
/// inner formatter fails, or leaves nothing but whitespace, the cleaner runs
/// instead, so [`FallbackFormatter::format_value`] never fails and never
/// returns an empty string.
pub struct FallbackFormatter {
    inner: Box<dyn Formatter>,
}

impl FallbackFormatter {
    pub fn new(inner: impl Formatter + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn format_value(&self, parameter: &Parameter, value: &str) -> String {
        if !parameter.has_format_rules() {
            return basic_clean(value);
        }

        match self.inner.format(parameter, value) {
            Ok(formatted) if formatted.trim().is_empty() => {
                tracing::debug!(
                    parameter = %parameter.code,
                    "Formatting left an empty value, falling back to basic cleaner"
                );
                basic_clean(value)
            }
            Ok(formatted) => formatted,
            Err(err) => {
                tracing::warn!(
                    parameter = %parameter.code,
                    rules = parameter.format_rules.as_deref().unwrap_or_default(),
                    error = %err,
                    "Parameter formatting failed, falling back to basic cleaner"
                );
                basic_clean(value)
            }
        }
    }
}

impl Default for FallbackFormatter {
    fn default() -> Self {
        Self::new(RuleFormatter)
    }
}

impl std::fmt::Debug for FallbackFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackFormatter").finish_non_exhaustive()
    }
}
