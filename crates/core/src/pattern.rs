//! Coarse shape signatures for nomenclature strings.
//!
//! Each `_`-delimited token is classified and the class letters are joined
//! with `-`, so `Oppenheimer_2023_FTR_51` becomes `T-Y-C-N`. Festivals with
//! many distinct signatures have inconsistent naming.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(19|20)\d{2}$").expect("valid regex"));
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{2,6}$").expect("valid regex"));

/// Shape class of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenShape {
    /// A four-digit year between 1900 and 2099.
    Year,
    Numeric,
    /// Short all-caps code such as `FTR`, `EN`, `4K`.
    Code,
    Text,
}

impl TokenShape {
    pub fn letter(&self) -> char {
        match self {
            Self::Year => 'Y',
            Self::Numeric => 'N',
            Self::Code => 'C',
            Self::Text => 'T',
        }
    }
}

/// Classify one token. Year wins over Numeric, Numeric over Code.
pub fn classify_token(token: &str) -> TokenShape {
    if YEAR_RE.is_match(token) {
        TokenShape::Year
    } else if NUMERIC_RE.is_match(token) {
        TokenShape::Numeric
    } else if CODE_RE.is_match(token) {
        TokenShape::Code
    } else {
        TokenShape::Text
    }
}

/// Pattern signature of a nomenclature. Empty tokens are ignored.
pub fn pattern_signature(nomenclature: &str) -> String {
    nomenclature
        .split('_')
        .filter(|token| !token.is_empty())
        .map(|token| classify_token(token).letter().to_string())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_tokens() {
        assert_eq!(classify_token("2023"), TokenShape::Year);
        assert_eq!(classify_token("1899"), TokenShape::Numeric);
        assert_eq!(classify_token("51"), TokenShape::Numeric);
        assert_eq!(classify_token("FTR"), TokenShape::Code);
        assert_eq!(classify_token("4K"), TokenShape::Code);
        assert_eq!(classify_token("FORMATS"), TokenShape::Text);
        assert_eq!(classify_token("Oppenheimer"), TokenShape::Text);
        assert_eq!(classify_token("Ftr"), TokenShape::Text);
    }

    #[test]
    fn builds_signature() {
        assert_eq!(pattern_signature("Oppenheimer_2023_FTR_51"), "T-Y-C-N");
        assert_eq!(pattern_signature("Oppenheimer_2023_FORMAT"), "T-Y-C");
    }

    #[test]
    fn signature_ignores_empty_tokens() {
        assert_eq!(pattern_signature("A__B_"), "T-T");
        assert_eq!(pattern_signature(""), "");
    }
}
