//! DCPrism nomenclature engine.
//!
//! Builds standardized DCP identifiers for festival movies from an ordered,
//! per-festival slot configuration:
//!
//! - [`parameter`]: the parameter catalog and its validation rules.
//! - [`slot`]: festival slots, slot formatting and configuration checks.
//! - [`repository`]: cached access to a festival's active slots.
//! - [`extractor`] / [`formatting`]: value lookup and normalization.
//! - [`builder`]: [`NomenclatureBuilder`], the build/preview entry point.
//! - [`stats`]: completion, validation and health analytics.
//!
//! The crate is synchronous and has no database dependency; persistence is
//! plugged in through [`repository::SlotStore`].

pub mod builder;
pub mod error;
pub mod extractor;
pub mod formatting;
pub mod movie;
pub mod parameter;
pub mod pattern;
pub mod repository;
pub mod slot;
pub mod stats;
pub mod types;

pub use builder::{BuildResult, NomenclatureBuilder, NO_NOMENCLATURE_CONFIG};
pub use error::CoreError;
pub use movie::{Festival, Movie};
pub use repository::{NomenclatureRepository, SlotRepository, SlotStore};
pub use stats::NomenclatureStatsService;
