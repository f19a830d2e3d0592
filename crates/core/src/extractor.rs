//! Parameter value extraction.
//!
//! The builder asks a [`ParameterValueExtractor`] for each parameter's value.
//! [`MovieAttributeExtractor`] is the default: it reads stored parameter
//! values and movie attributes that the caller has already loaded.

use moka::sync::Cache;
use regex::Regex;

use crate::movie::Movie;
use crate::parameter::{ExtractionSource, Parameter};

/// Separator between attribute key and regex in an extraction pattern,
/// e.g. `title=~^(\w+)`.
pub const PATTERN_REGEX_MARKER: &str = "=~";

/// Resolves a parameter's value for a movie. `None` means "no value".
pub trait ParameterValueExtractor: Send + Sync {
    fn get_value(&self, movie: &Movie, parameter: &Parameter) -> Option<String>;
}

/// Upper bound on distinct extraction regexes kept compiled.
pub const MAX_COMPILED_PATTERNS: u64 = 1_024;

/// Extracts values from preloaded movie data.
///
/// Lookup order:
///
/// 1. For `DCP`, `metadata` and `manual` parameters, the movie's stored
///    value for the parameter code.
/// 2. The movie attribute named by `extraction_pattern` (or the lowercased
///    code). A pattern `attr=~regex` applies the regex to the attribute and
///    keeps the first capture group, or the whole match without groups.
/// 3. The parameter's `default_value`.
///
/// Regexes are compiled once per expression. An invalid expression is
/// remembered as `None` and logged only the first time.
#[derive(Debug, Clone)]
pub struct MovieAttributeExtractor {
    patterns: Cache<String, Option<Regex>>,
}

impl MovieAttributeExtractor {
    pub fn new() -> Self {
        Self {
            patterns: Cache::new(MAX_COMPILED_PATTERNS),
        }
    }

    /// Number of expressions currently compiled (or known invalid).
    pub fn compiled_pattern_count(&self) -> u64 {
        self.patterns.run_pending_tasks();
        self.patterns.entry_count()
    }

    fn compiled(&self, parameter: &Parameter, expr: &str) -> Option<Regex> {
        self.patterns.get_with_by_ref(expr, || match Regex::new(expr) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(
                    parameter = %parameter.code,
                    pattern = expr,
                    error = %err,
                    "Invalid extraction pattern"
                );
                None
            }
        })
    }

    fn extract_attribute(&self, movie: &Movie, parameter: &Parameter) -> Option<String> {
        let pattern = parameter
            .extraction_pattern
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let Some(pattern) = pattern else {
            return movie.attribute(&parameter.code.to_lowercase());
        };

        let Some((key, expr)) = pattern.split_once(PATTERN_REGEX_MARKER) else {
            return movie.attribute(pattern);
        };

        let text = movie.attribute(key.trim())?;
        let re = self.compiled(parameter, expr)?;

        let captures = re.captures(&text)?;
        let matched = captures.get(1).or_else(|| captures.get(0))?;
        let value = matched.as_str().trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

impl Default for MovieAttributeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterValueExtractor for MovieAttributeExtractor {
    fn get_value(&self, movie: &Movie, parameter: &Parameter) -> Option<String> {
        let stored = match parameter.extraction_source {
            ExtractionSource::Dcp | ExtractionSource::Metadata | ExtractionSource::Manual => {
                movie.parameter_value(&parameter.code)
            }
            ExtractionSource::Auto => None,
        };

        stored
            .or_else(|| self.extract_attribute(movie, parameter))
            .or_else(|| {
                parameter
                    .default_value
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .map(str::to_string)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::test_support::parameter;

    #[test]
    fn auto_source_reads_lowercased_code_attribute() {
        let movie = Movie::new(1, "Oppenheimer").with_attribute("year", 2023);
        let p = parameter("YEAR", "Year");
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p).as_deref(), Some("2023"));
    }

    #[test]
    fn auto_source_ignores_stored_values() {
        let movie = Movie::new(1, "X").with_parameter_value("YEAR", "1999");
        let p = parameter("YEAR", "Year");
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p), None);
    }

    #[test]
    fn stored_sources_prefer_parameter_values() {
        let movie = Movie::new(1, "X")
            .with_parameter_value("AUDIO", "51")
            .with_attribute("audio", "20");
        let mut p = parameter("AUDIO", "Audio");
        p.extraction_source = ExtractionSource::Dcp;
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p).as_deref(), Some("51"));
    }

    #[test]
    fn stored_source_falls_back_to_attribute() {
        let movie = Movie::new(1, "X").with_attribute("audio", "20");
        let mut p = parameter("AUDIO", "Audio");
        p.extraction_source = ExtractionSource::Manual;
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p).as_deref(), Some("20"));
    }

    #[test]
    fn pattern_names_attribute() {
        let movie = Movie::new(1, "Oppenheimer");
        let mut p = parameter("FILM", "Film");
        p.extraction_pattern = Some("title".to_string());
        assert_eq!(
            MovieAttributeExtractor::new().get_value(&movie, &p).as_deref(),
            Some("Oppenheimer")
        );
    }

    #[test]
    fn pattern_regex_takes_first_group() {
        let movie = Movie::new(1, "X").with_attribute("release_date", "2023-07-21");
        let mut p = parameter("YEAR", "Year");
        p.extraction_pattern = Some(r"release_date=~^(\d{4})-".to_string());
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p).as_deref(), Some("2023"));
    }

    #[test]
    fn pattern_regex_without_group_takes_whole_match() {
        let movie = Movie::new(1, "X").with_attribute("resolution", "Scope 4K DCI");
        let mut p = parameter("RES", "Resolution");
        p.extraction_pattern = Some(r"resolution=~\d+K".to_string());
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p).as_deref(), Some("4K"));
    }

    #[test]
    fn invalid_regex_yields_default() {
        let movie = Movie::new(1, "X").with_attribute("resolution", "4K");
        let mut p = parameter("RES", "Resolution");
        p.extraction_pattern = Some("resolution=~(".to_string());
        p.default_value = Some("2K".to_string());
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p).as_deref(), Some("2K"));
    }

    #[test]
    fn missing_everything_yields_none() {
        let movie = Movie::new(1, "X");
        let p = parameter("FORMAT", "Format");
        assert_eq!(MovieAttributeExtractor::new().get_value(&movie, &p), None);
    }

    #[test]
    fn regex_is_compiled_once_per_expression() {
        let extractor = MovieAttributeExtractor::new();
        let mut p = parameter("YEAR", "Year");
        p.extraction_pattern = Some(r"release_date=~^(\d{4})-".to_string());
        let mut q = parameter("RELEASE_YEAR", "Release year");
        q.extraction_pattern = p.extraction_pattern.clone();

        for (id, date) in [(1, "2023-07-21"), (2, "1999-01-01"), (3, "2010-05-05")] {
            let movie = Movie::new(id, "X").with_attribute("release_date", date);
            assert_eq!(extractor.get_value(&movie, &p).as_deref(), Some(&date[..4]));
            assert_eq!(extractor.get_value(&movie, &q).as_deref(), Some(&date[..4]));
        }
        assert_eq!(extractor.compiled_pattern_count(), 1);
    }

    #[test]
    fn invalid_regex_is_remembered() {
        let extractor = MovieAttributeExtractor::new();
        let movie = Movie::new(1, "X").with_attribute("resolution", "4K");
        let mut p = parameter("RES", "Resolution");
        p.extraction_pattern = Some("resolution=~(".to_string());
        assert_eq!(extractor.get_value(&movie, &p), None);
        assert_eq!(extractor.get_value(&movie, &p), None);
        assert_eq!(extractor.compiled_pattern_count(), 1);
    }
}
