//! Nomenclature statistics and analytics.
//!
//! Read-only aggregation over repeated builder previews. Nothing here holds
//! state between calls: every report is recomputed from the movies the
//! caller passes in, and only the slot configuration benefits from the
//! repository cache.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::builder::{BuildResult, NomenclatureBuilder};
use crate::error::CoreError;
use crate::movie::{Festival, Movie};
use crate::pattern::pattern_signature;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Error rate above which an `error_rate` recommendation is raised.
pub const ERROR_RATE_THRESHOLD: f64 = 0.10;

/// Average length above which a `length` recommendation is raised.
pub const LENGTH_THRESHOLD: f64 = 100.0;

/// Average length above which the health score takes a penalty.
pub const LENGTH_PENALTY_THRESHOLD: f64 = 120.0;

/// Share of partial/missing nomenclatures above which a `completion`
/// recommendation is raised.
pub const INCOMPLETION_THRESHOLD: f64 = 0.30;

/// Number of distinct patterns above which a `consistency` recommendation is
/// raised.
pub const PATTERN_DIVERSITY_THRESHOLD: usize = 10;

/// Number of entries in [`ValidationReport::most_common_issues`].
pub const TOP_ISSUES: usize = 5;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Completion state of one movie's nomenclature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Every required slot had a value.
    Complete,
    /// Some, but not all, required slots had a value.
    Partial,
    /// No configuration, no required slots, or no required slot filled.
    NoNomenclature,
}

/// Classify a preview result by its required parts.
///
/// The "no required slots" check comes first, so a festival without required
/// slots classifies every movie as [`CompletionStatus::NoNomenclature`].
pub fn classify_completion(result: &BuildResult) -> CompletionStatus {
    let (required, filled) = result
        .parts
        .iter()
        .filter(|p| p.is_required)
        .fold((0usize, 0usize), |(required, filled), p| {
            (required + 1, filled + usize::from(p.is_filled()))
        });

    if required == 0 || filled == 0 {
        CompletionStatus::NoNomenclature
    } else if filled == required {
        CompletionStatus::Complete
    } else {
        CompletionStatus::Partial
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A movie and the length of its nomenclature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthSample {
    pub movie_id: DbId,
    pub title: String,
    pub nomenclature: String,
    pub length: usize,
}

/// Length distribution over configured nomenclatures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LengthStats {
    pub average: f64,
    pub longest: Option<LengthSample>,
    pub shortest: Option<LengthSample>,
}

/// Output of [`NomenclatureStatsService::get_nomenclature_stats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NomenclatureStats {
    pub festival_id: DbId,
    pub festival_name: String,
    pub total_movies: usize,
    pub movies_with_complete_nomenclature: usize,
    pub movies_with_partial_nomenclature: usize,
    pub movies_without_nomenclature: usize,
    /// Share of complete nomenclatures, 0.0 to 1.0.
    pub completion_rate: f64,
    /// Movies with a value per parameter name.
    pub parameter_usage: BTreeMap<String, usize>,
    pub length: LengthStats,
    /// Movies per pattern signature.
    pub patterns: BTreeMap<String, usize>,
    /// Movies whose preview is not valid.
    pub validation_errors: usize,
    pub generated_at: Timestamp,
}

impl NomenclatureStats {
    pub fn error_rate(&self) -> f64 {
        ratio(self.validation_errors, self.total_movies)
    }

    pub fn incompletion_rate(&self) -> f64 {
        ratio(
            self.movies_with_partial_nomenclature + self.movies_without_nomenclature,
            self.total_movies,
        )
    }

    pub fn pattern_diversity(&self) -> usize {
        self.patterns.len()
    }
}

/// Validation detail for one movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieValidation {
    pub movie_id: DbId,
    pub title: String,
    pub nomenclature: String,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub missing_parameters: Vec<String>,
}

/// How often an issue occurred across a festival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFrequency {
    pub issue: String,
    pub count: usize,
}

/// Output of [`NomenclatureStatsService::get_validation_report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub festival_id: DbId,
    pub total_movies: usize,
    pub valid_movies: usize,
    pub invalid_movies: usize,
    pub movies: Vec<MovieValidation>,
    /// Top issues by count, ties broken alphabetically.
    pub most_common_issues: Vec<IssueFrequency>,
    pub generated_at: Timestamp,
}

/// One festival's row in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FestivalSummary {
    pub festival_id: DbId,
    pub festival_name: String,
    pub total_movies: usize,
    pub completion_rate: f64,
    pub average_length: f64,
    pub validation_errors: usize,
    pub pattern_count: usize,
}

/// A festival singled out by a comparison metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FestivalHighlight {
    pub festival_id: DbId,
    pub festival_name: String,
    pub value: f64,
}

/// Output of [`NomenclatureStatsService::compare_festivals`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FestivalComparison {
    /// Sorted by completion rate, highest first.
    pub festivals: Vec<FestivalSummary>,
    pub best_completion_rate: Option<FestivalHighlight>,
    pub most_movies: Option<FestivalHighlight>,
    pub highest_average_length: Option<FestivalHighlight>,
    pub generated_at: Timestamp,
}

/// Area a recommendation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    ErrorRate,
    Length,
    Completion,
    Consistency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

/// A single advisory item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub severity: Severity,
    pub message: String,
    pub action: String,
}

/// Overall health bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
    NoData,
}

/// Inputs to the health score and recommendation rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub total_movies: usize,
    pub error_rate: f64,
    pub completion_rate: f64,
    pub incompletion_rate: f64,
    pub average_length: f64,
    pub pattern_diversity: usize,
}

impl From<&NomenclatureStats> for HealthMetrics {
    fn from(stats: &NomenclatureStats) -> Self {
        Self {
            total_movies: stats.total_movies,
            error_rate: stats.error_rate(),
            completion_rate: stats.completion_rate,
            incompletion_rate: stats.incompletion_rate(),
            average_length: stats.length.average,
            pattern_diversity: stats.pattern_diversity(),
        }
    }
}

/// Output of [`NomenclatureStatsService::get_optimization_recommendations`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub festival_id: DbId,
    pub overall_health: HealthStatus,
    /// `None` when there are no movies to score.
    pub health_score: Option<f64>,
    pub metrics: HealthMetrics,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Pure scoring functions
// ---------------------------------------------------------------------------

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Weighted health score, clamped to `0.0..=100.0`.
///
/// Starts at 100, loses `error_rate * 40` and `(1 - completion_rate) * 30`,
/// and 10 more when the average length exceeds [`LENGTH_PENALTY_THRESHOLD`].
pub fn compute_health_score(error_rate: f64, completion_rate: f64, average_length: f64) -> f64 {
    let mut score = 100.0;
    score -= error_rate * 40.0;
    score -= (1.0 - completion_rate) * 30.0;
    if average_length > LENGTH_PENALTY_THRESHOLD {
        score -= 10.0;
    }
    score.clamp(0.0, 100.0)
}

/// Bucket a health score.
pub fn classify_health(score: f64) -> HealthStatus {
    if score >= 90.0 {
        HealthStatus::Excellent
    } else if score >= 75.0 {
        HealthStatus::Good
    } else if score >= 60.0 {
        HealthStatus::Fair
    } else if score >= 40.0 {
        HealthStatus::Poor
    } else {
        HealthStatus::Critical
    }
}

/// Apply the threshold rules to a festival's metrics.
pub fn recommendations_for(metrics: &HealthMetrics) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    if metrics.total_movies == 0 {
        return recommendations;
    }

    if metrics.error_rate > ERROR_RATE_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationType::ErrorRate,
            severity: Severity::High,
            message: format!(
                "{:.1}% of movies have nomenclature validation errors",
                metrics.error_rate * 100.0
            ),
            action: "Fill in the missing required parameters or relax the required flags"
                .to_string(),
        });
    }

    if metrics.average_length > LENGTH_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationType::Length,
            severity: Severity::Medium,
            message: format!(
                "Average nomenclature length is {:.0} characters",
                metrics.average_length
            ),
            action: "Shorten values with truncate rules or remove low-value parameters"
                .to_string(),
        });
    }

    if metrics.incompletion_rate > INCOMPLETION_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationType::Completion,
            severity: Severity::High,
            message: format!(
                "{:.1}% of movies have incomplete nomenclatures",
                metrics.incompletion_rate * 100.0
            ),
            action: "Review which parameters are marked required and how they are extracted"
                .to_string(),
        });
    }

    if metrics.pattern_diversity > PATTERN_DIVERSITY_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationType::Consistency,
            severity: Severity::Medium,
            message: format!(
                "{} distinct nomenclature patterns are in use",
                metrics.pattern_diversity
            ),
            action: "Standardize parameter formatting rules so values share one shape"
                .to_string(),
        });
    }

    recommendations
}

/// Most frequent issues, count descending then text ascending.
pub fn most_common_issues<'a>(
    issues: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<IssueFrequency> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for issue in issues {
        *counts.entry(issue).or_default() += 1;
    }
    let mut ranked: Vec<IssueFrequency> = counts
        .into_iter()
        .map(|(issue, count)| IssueFrequency {
            issue: issue.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.issue.cmp(&b.issue)));
    ranked.truncate(limit);
    ranked
}

/// First entry with the highest value.
fn highlight_max(
    summaries: &[FestivalSummary],
    value: impl Fn(&FestivalSummary) -> f64,
) -> Option<FestivalHighlight> {
    let mut best: Option<(&FestivalSummary, f64)> = None;
    for summary in summaries {
        let v = value(summary);
        if best.map_or(true, |(_, current)| v > current) {
            best = Some((summary, v));
        }
    }
    best.map(|(summary, value)| FestivalHighlight {
        festival_id: summary.festival_id,
        festival_name: summary.festival_name.clone(),
        value,
    })
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Stateless analytics over a [`NomenclatureBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct NomenclatureStatsService<'a> {
    builder: &'a NomenclatureBuilder,
}

impl<'a> NomenclatureStatsService<'a> {
    pub fn new(builder: &'a NomenclatureBuilder) -> Self {
        Self { builder }
    }

    fn preview(&self, movie: &Movie, festival: &Festival) -> Result<BuildResult, CoreError> {
        self.builder.preview(movie, festival, &HashMap::new())
    }

    /// Completion, usage, length, pattern and validation statistics for every
    /// movie of a festival.
    pub fn get_nomenclature_stats(
        &self,
        festival: &Festival,
        movies: &[Movie],
    ) -> Result<NomenclatureStats, CoreError> {
        let mut complete = 0;
        let mut partial = 0;
        let mut without = 0;
        let mut validation_errors = 0;
        let mut parameter_usage: BTreeMap<String, usize> = BTreeMap::new();
        let mut patterns: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_length = 0usize;
        let mut measured = 0usize;
        let mut longest: Option<LengthSample> = None;
        let mut shortest: Option<LengthSample> = None;

        for movie in movies {
            let result = self.preview(movie, festival)?;

            match classify_completion(&result) {
                CompletionStatus::Complete => complete += 1,
                CompletionStatus::Partial => partial += 1,
                CompletionStatus::NoNomenclature => without += 1,
            }
            if !result.is_valid {
                validation_errors += 1;
            }

            for part in result.parts.iter().filter(|p| p.is_filled()) {
                *parameter_usage.entry(part.parameter_name.clone()).or_default() += 1;
            }

            if !result.is_configured() {
                continue;
            }

            *patterns
                .entry(pattern_signature(&result.final_nomenclature))
                .or_default() += 1;

            let length = result.final_nomenclature.chars().count();
            total_length += length;
            measured += 1;
            let sample = LengthSample {
                movie_id: movie.id,
                title: movie.title.clone(),
                nomenclature: result.final_nomenclature,
                length,
            };
            if longest.as_ref().map_or(true, |l| length > l.length) {
                longest = Some(sample.clone());
            }
            if shortest.as_ref().map_or(true, |s| length < s.length) {
                shortest = Some(sample);
            }
        }

        let stats = NomenclatureStats {
            festival_id: festival.id,
            festival_name: festival.name.clone(),
            total_movies: movies.len(),
            movies_with_complete_nomenclature: complete,
            movies_with_partial_nomenclature: partial,
            movies_without_nomenclature: without,
            completion_rate: ratio(complete, movies.len()),
            parameter_usage,
            length: LengthStats {
                average: ratio(total_length, measured),
                longest,
                shortest,
            },
            patterns,
            validation_errors,
            generated_at: chrono::Utc::now(),
        };

        tracing::debug!(
            festival_id = festival.id,
            total = stats.total_movies,
            complete,
            partial,
            without,
            "Computed nomenclature stats"
        );

        Ok(stats)
    }

    /// Per-movie warnings and the most common issues across the festival.
    pub fn get_validation_report(
        &self,
        festival: &Festival,
        movies: &[Movie],
    ) -> Result<ValidationReport, CoreError> {
        let mut entries = Vec::with_capacity(movies.len());
        for movie in movies {
            let result = self.preview(movie, festival)?;
            entries.push(MovieValidation {
                movie_id: movie.id,
                title: movie.title.clone(),
                nomenclature: result.final_nomenclature,
                is_valid: result.is_valid,
                warnings: result.warnings,
                missing_parameters: result.missing_required,
            });
        }

        let most_common_issues = most_common_issues(
            entries
                .iter()
                .flat_map(|e| e.warnings.iter().map(String::as_str)),
            TOP_ISSUES,
        );
        let valid_movies = entries.iter().filter(|e| e.is_valid).count();

        Ok(ValidationReport {
            festival_id: festival.id,
            total_movies: entries.len(),
            valid_movies,
            invalid_movies: entries.len() - valid_movies,
            movies: entries,
            most_common_issues,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Side-by-side summary of several festivals.
    pub fn compare_festivals(
        &self,
        festivals: &[(Festival, Vec<Movie>)],
    ) -> Result<FestivalComparison, CoreError> {
        let mut summaries = Vec::with_capacity(festivals.len());
        for (festival, movies) in festivals {
            let stats = self.get_nomenclature_stats(festival, movies)?;
            summaries.push(FestivalSummary {
                festival_id: festival.id,
                festival_name: festival.name.clone(),
                total_movies: stats.total_movies,
                completion_rate: stats.completion_rate,
                average_length: stats.length.average,
                validation_errors: stats.validation_errors,
                pattern_count: stats.pattern_diversity(),
            });
        }

        summaries.sort_by(|a, b| {
            b.completion_rate
                .total_cmp(&a.completion_rate)
                .then_with(|| a.festival_id.cmp(&b.festival_id))
        });

        Ok(FestivalComparison {
            best_completion_rate: highlight_max(&summaries, |s| s.completion_rate),
            most_movies: highlight_max(&summaries, |s| s.total_movies as f64),
            highest_average_length: highlight_max(&summaries, |s| s.average_length),
            festivals: summaries,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Threshold-based recommendations and an overall health bucket.
    pub fn get_optimization_recommendations(
        &self,
        festival: &Festival,
        movies: &[Movie],
    ) -> Result<OptimizationReport, CoreError> {
        let stats = self.get_nomenclature_stats(festival, movies)?;
        Ok(optimization_report(&stats))
    }
}

/// Build the optimization report from already computed stats.
pub fn optimization_report(stats: &NomenclatureStats) -> OptimizationReport {
    let metrics = HealthMetrics::from(stats);
    let (overall_health, health_score) = if metrics.total_movies == 0 {
        (HealthStatus::NoData, None)
    } else {
        let score = compute_health_score(
            metrics.error_rate,
            metrics.completion_rate,
            metrics.average_length,
        );
        (classify_health(score), Some(score))
    };

    OptimizationReport {
        festival_id: stats.festival_id,
        overall_health,
        health_score,
        recommendations: recommendations_for(&metrics),
        metrics,
        generated_at: chrono::Utc::now(),
    }
}
