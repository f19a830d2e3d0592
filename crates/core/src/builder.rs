//! Nomenclature builder: turns a festival's slot configuration and a movie's
//! values into the standardized DCP identifier string.
//!
//! For each active slot, in order:
//!
//! 1. skip the slot if its parameter does not resolve;
//! 2. take the override (preview only), the extracted value, or the slot's
//!    default value;
//! 3. substitute the parameter code when nothing was found, recording a
//!    warning for required slots (the build still completes);
//! 4. apply parameter formatting with the fallback cleaner as safety net;
//! 5. apply slot formatting (prefix/suffix);
//! 6. keep the part if it is non-empty.
//!
//! Parts are joined by a [`JoinStrategy`]. The default
//! [`FirstSlotSeparator`] uses the first active slot's separator for every
//! join.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::extractor::{MovieAttributeExtractor, ParameterValueExtractor};
use crate::formatting::{FallbackFormatter, Formatter};
use crate::movie::{Festival, Movie};
use crate::repository::SlotRepository;
use crate::slot::{AffixSlotFormatter, NomenclatureSlot, SlotFormatter};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Returned instead of a nomenclature when the festival has no active slots.
///
/// This is a valid string, so callers must compare against it explicitly.
pub const NO_NOMENCLATURE_CONFIG: &str = "NO_NOMENCLATURE_CONFIG";

/// Separator used when the first slot does not define one.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Placeholder for a missing value whose parameter has no code.
pub const PLACEHOLDER_CODE: &str = "PARAM";

/// Warning text for a required parameter with no value.
pub fn missing_required_warning(parameter_name: &str) -> String {
    format!("Required parameter missing: {parameter_name}")
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Per-slot breakdown of a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomenclaturePart {
    pub parameter_name: String,
    pub parameter_code: String,
    /// Value before placeholder substitution; `None` when nothing was found.
    pub raw_value: Option<String>,
    /// Slot output. Empty when the slot was dropped from the join.
    pub formatted_value: String,
    pub is_required: bool,
    pub order: i32,
    pub separator: Option<String>,
}

impl NomenclaturePart {
    pub fn is_filled(&self) -> bool {
        self.raw_value.is_some()
    }

    pub fn is_included(&self) -> bool {
        !self.formatted_value.is_empty()
    }
}

/// Structured output of [`NomenclatureBuilder::preview`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    pub final_nomenclature: String,
    /// One entry per slot whose parameter resolved, in slot order.
    pub parts: Vec<NomenclaturePart>,
    pub warnings: Vec<String>,
    /// Names of required parameters that had no value.
    pub missing_required: Vec<String>,
    pub is_valid: bool,
}

impl BuildResult {
    fn unconfigured() -> Self {
        Self {
            final_nomenclature: NO_NOMENCLATURE_CONFIG.to_string(),
            parts: Vec::new(),
            warnings: Vec::new(),
            missing_required: Vec::new(),
            is_valid: true,
        }
    }

    /// Whether the festival had any active slots.
    pub fn is_configured(&self) -> bool {
        self.final_nomenclature != NO_NOMENCLATURE_CONFIG
    }
}

/// A single successful build inside [`BulkBuildOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedNomenclature {
    pub movie_id: DbId,
    pub nomenclature: String,
}

/// A single failed build inside [`BulkBuildOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFailure {
    pub movie_id: DbId,
    pub error: String,
}

/// Result of building every movie of a festival.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkBuildOutcome {
    pub generated: Vec<GeneratedNomenclature>,
    pub failures: Vec<BuildFailure>,
}

// ---------------------------------------------------------------------------
// Join strategies
// ---------------------------------------------------------------------------

/// Joins the included parts into the final string.
pub trait JoinStrategy: Send + Sync {
    /// `slots` is the full active slot list; `parts` are the included parts
    /// in order.
    fn join(&self, slots: &[NomenclatureSlot], parts: &[&NomenclaturePart]) -> String;
}

/// Every join uses the first active slot's separator (or `_`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSlotSeparator;

impl JoinStrategy for FirstSlotSeparator {
    fn join(&self, slots: &[NomenclatureSlot], parts: &[&NomenclaturePart]) -> String {
        let separator = slots
            .first()
            .and_then(|s| s.separator.as_deref())
            .unwrap_or(DEFAULT_SEPARATOR);
        parts
            .iter()
            .map(|p| p.formatted_value.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Each part is followed by its own slot's separator (or `_`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PerSlotSeparator;

impl JoinStrategy for PerSlotSeparator {
    fn join(&self, _slots: &[NomenclatureSlot], parts: &[&NomenclaturePart]) -> String {
        let mut out = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                let previous = parts[i - 1];
                out.push_str(previous.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR));
            }
            out.push_str(&part.formatted_value);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds nomenclatures for movies within a festival.
///
/// Stateless apart from its collaborators; the only cached state is the slot
/// configuration held by the repository.
pub struct NomenclatureBuilder {
    repository: Arc<dyn SlotRepository>,
    extractor: Box<dyn ParameterValueExtractor>,
    formatter: FallbackFormatter,
    slot_formatter: Box<dyn SlotFormatter>,
    join_strategy: Box<dyn JoinStrategy>,
}

impl NomenclatureBuilder {
    pub fn new(repository: Arc<dyn SlotRepository>) -> Self {
        Self {
            repository,
            extractor: Box::new(MovieAttributeExtractor::new()),
            formatter: FallbackFormatter::default(),
            slot_formatter: Box::new(AffixSlotFormatter),
            join_strategy: Box::new(FirstSlotSeparator),
        }
    }

    pub fn with_extractor(mut self, extractor: impl ParameterValueExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the parameter formatter. It is always wrapped in the fallback
    /// cleaner.
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = FallbackFormatter::new(formatter);
        self
    }

    pub fn with_slot_formatter(mut self, slot_formatter: impl SlotFormatter + 'static) -> Self {
        self.slot_formatter = Box::new(slot_formatter);
        self
    }

    pub fn with_join_strategy(mut self, join_strategy: impl JoinStrategy + 'static) -> Self {
        self.join_strategy = Box::new(join_strategy);
        self
    }

    pub fn repository(&self) -> &dyn SlotRepository {
        self.repository.as_ref()
    }

    /// Build the nomenclature string for `movie` within `festival`.
    ///
    /// Returns [`NO_NOMENCLATURE_CONFIG`] when the festival has no active
    /// slots. Only repository failures are errors.
    pub fn build(&self, movie: &Movie, festival: &Festival) -> Result<String, CoreError> {
        self.assemble(movie, festival, None)
            .map(|result| result.final_nomenclature)
    }

    /// Same as [`build`](Self::build) with per-parameter-name overrides, and
    /// the full per-slot breakdown.
    pub fn preview(
        &self,
        movie: &Movie,
        festival: &Festival,
        overrides: &HashMap<String, String>,
    ) -> Result<BuildResult, CoreError> {
        self.assemble(movie, festival, Some(overrides))
    }

    /// Build every movie, collecting failures instead of stopping.
    pub fn build_many(&self, movies: &[Movie], festival: &Festival) -> BulkBuildOutcome {
        let mut outcome = BulkBuildOutcome::default();
        for movie in movies {
            match self.build(movie, festival) {
                Ok(nomenclature) => outcome.generated.push(GeneratedNomenclature {
                    movie_id: movie.id,
                    nomenclature,
                }),
                Err(err) => {
                    tracing::error!(
                        movie_id = movie.id,
                        festival_id = festival.id,
                        error = %err,
                        "Nomenclature build failed"
                    );
                    outcome.failures.push(BuildFailure {
                        movie_id: movie.id,
                        error: err.to_string(),
                    });
                }
            }
        }
        outcome
    }

    fn assemble(
        &self,
        movie: &Movie,
        festival: &Festival,
        overrides: Option<&HashMap<String, String>>,
    ) -> Result<BuildResult, CoreError> {
        let slots = self.repository.get_active_nomenclatures(festival.id)?;
        if slots.is_empty() {
            return Ok(BuildResult::unconfigured());
        }

        let mut parts = Vec::with_capacity(slots.len());
        let mut warnings = Vec::new();
        let mut missing_required = Vec::new();

        for slot in slots.iter() {
            let Some(parameter) = slot.resolve_parameter() else {
                continue;
            };

            let raw_value = match overrides.and_then(|o| o.get(&parameter.name)) {
                Some(value) => Some(value.clone()).filter(|v| !v.trim().is_empty()),
                None => self.extractor.get_value(movie, parameter),
            }
            .or_else(|| slot.default_value().map(str::to_string));

            let value = match &raw_value {
                Some(value) => value.clone(),
                None => {
                    if slot.is_required {
                        missing_required.push(parameter.name.clone());
                        warnings.push(missing_required_warning(&parameter.name));
                    }
                    parameter.placeholder().to_string()
                }
            };

            let formatted = self.formatter.format_value(parameter, &value);
            let slot_output = self.slot_formatter.format_slot(slot, &formatted, movie);

            parts.push(NomenclaturePart {
                parameter_name: parameter.name.clone(),
                parameter_code: parameter.code.clone(),
                raw_value,
                formatted_value: slot_output,
                is_required: slot.is_required,
                order: slot.order_position,
                separator: slot.separator.clone(),
            });
        }

        if !missing_required.is_empty() {
            tracing::warn!(
                movie_id = movie.id,
                festival_id = festival.id,
                missing = ?missing_required,
                "Required nomenclature parameters missing"
            );
        }

        let included: Vec<&NomenclaturePart> = parts.iter().filter(|p| p.is_included()).collect();
        let final_nomenclature = self.join_strategy.join(&slots, &included);

        Ok(BuildResult {
            final_nomenclature,
            is_valid: warnings.is_empty(),
            parts,
            warnings,
            missing_required,
        })
    }
}

impl std::fmt::Debug for NomenclatureBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NomenclatureBuilder")
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}
