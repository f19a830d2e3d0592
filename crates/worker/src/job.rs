//! Batch nomenclature generation over festivals.

use std::sync::Arc;

use anyhow::Context;
use dcprism_core::builder::{BulkBuildOutcome, NomenclatureBuilder, NO_NOMENCLATURE_CONFIG};
use dcprism_core::error::CoreError;
use dcprism_core::movie::{Festival, Movie};
use dcprism_core::repository::{MemoryCacheStore, NomenclatureRepository};
use dcprism_core::slot::validate_slot_configuration;
use dcprism_core::stats::{
    optimization_report, NomenclatureStats, NomenclatureStatsService, OptimizationReport,
};
use dcprism_db::repositories::{FestivalRepo, MovieRepo};
use dcprism_db::{DbPool, PgSlotStore};
use serde::Serialize;

use crate::config::WorkerConfig;

/// Everything computed for one festival.
#[derive(Debug, Clone, Serialize)]
pub struct FestivalRun {
    pub festival: Festival,
    pub outcome: BulkBuildOutcome,
    pub stats: NomenclatureStats,
    pub report: OptimizationReport,
    /// Slot configuration problems, as display messages.
    pub config_issues: Vec<String>,
}

/// Totals across a worker run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub festivals: usize,
    pub generated: usize,
    pub failures: usize,
    pub written: usize,
}

/// Build, analyse and check one festival. Blocking: call from a blocking
/// thread when the builder is backed by [`PgSlotStore`].
pub fn process_festival(
    builder: &NomenclatureBuilder,
    festival: Festival,
    movies: &[Movie],
) -> Result<FestivalRun, CoreError> {
    let slots = builder.repository().get_nomenclatures(festival.id, false)?;
    let config_issues: Vec<String> = validate_slot_configuration(&slots)
        .iter()
        .map(|issue| issue.message())
        .collect();

    let outcome = builder.build_many(movies, &festival);
    let stats = NomenclatureStatsService::new(builder).get_nomenclature_stats(&festival, movies)?;
    let report = optimization_report(&stats);

    Ok(FestivalRun {
        festival,
        outcome,
        stats,
        report,
        config_issues,
    })
}

fn log_festival_run(run: &FestivalRun) {
    let festival_id = run.festival.id;
    for issue in &run.config_issues {
        tracing::warn!(festival_id, issue = %issue, "Nomenclature configuration issue");
    }

    tracing::info!(
        festival_id,
        festival = %run.festival.name,
        total = run.stats.total_movies,
        complete = run.stats.movies_with_complete_nomenclature,
        partial = run.stats.movies_with_partial_nomenclature,
        without = run.stats.movies_without_nomenclature,
        failures = run.outcome.failures.len(),
        health = ?run.report.overall_health,
        health_score = ?run.report.health_score,
        "Festival nomenclatures generated"
    );

    for rec in &run.report.recommendations {
        tracing::warn!(
            festival_id,
            kind = ?rec.kind,
            severity = ?rec.severity,
            action = %rec.action,
            "{}",
            rec.message
        );
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string(&run.stats) {
            Ok(json) => tracing::debug!(festival_id, stats = %json, "Festival stats"),
            Err(e) => tracing::debug!(festival_id, error = %e, "Could not serialize stats"),
        }
    }
}

async fn resolve_festivals(pool: &DbPool, config: &WorkerConfig) -> anyhow::Result<Vec<Festival>> {
    let Some(ids) = &config.festival_ids else {
        let rows = FestivalRepo::list_active(pool)
            .await
            .context("Failed to list active festivals")?;
        return Ok(rows.into_iter().map(Festival::from).collect());
    };

    let mut festivals = Vec::with_capacity(ids.len());
    for &id in ids {
        match FestivalRepo::find_by_id(pool, id)
            .await
            .with_context(|| format!("Failed to load festival {id}"))?
        {
            Some(row) => festivals.push(Festival::from(row)),
            None => tracing::warn!(festival_id = id, "Festival not found, skipping"),
        }
    }
    Ok(festivals)
}

async fn write_back(pool: &DbPool, outcome: &BulkBuildOutcome) -> usize {
    let mut written = 0;
    for generated in &outcome.generated {
        if generated.nomenclature == NO_NOMENCLATURE_CONFIG {
            continue;
        }
        match MovieRepo::update_nomenclature(pool, generated.movie_id, &generated.nomenclature)
            .await
        {
            Ok(true) => written += 1,
            Ok(false) => {
                tracing::warn!(movie_id = generated.movie_id, "Movie vanished before write-back")
            }
            Err(e) => tracing::error!(
                movie_id = generated.movie_id,
                error = %e,
                "Failed to store nomenclature"
            ),
        }
    }
    written
}

/// Generate nomenclatures for the configured festivals.
///
/// A failing festival is logged and skipped; the run only fails when the
/// festival list itself cannot be loaded.
pub async fn run(config: &WorkerConfig, pool: DbPool) -> anyhow::Result<RunSummary> {
    dcprism_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    let store = PgSlotStore::from_current(pool.clone())?;
    let repository =
        NomenclatureRepository::with_cache(store, MemoryCacheStore::new(config.cache_ttl));
    let builder = Arc::new(NomenclatureBuilder::new(Arc::new(repository)));

    let festivals = resolve_festivals(&pool, config).await?;
    tracing::info!(count = festivals.len(), "Processing festivals");

    let mut summary = RunSummary::default();
    for festival in festivals {
        let festival_id = festival.id;
        let movies = match MovieRepo::list_for_festival(&pool, festival_id).await {
            Ok(movies) => movies,
            Err(e) => {
                tracing::error!(festival_id, error = %e, "Failed to load festival movies");
                continue;
            }
        };

        let worker_builder = Arc::clone(&builder);
        let result = tokio::task::spawn_blocking(move || {
            process_festival(&worker_builder, festival, &movies)
        })
        .await
        .context("Festival task panicked")?;

        let run = match result {
            Ok(run) => run,
            Err(e) => {
                tracing::error!(festival_id, error = %e, "Festival processing failed");
                continue;
            }
        };

        log_festival_run(&run);
        summary.festivals += 1;
        summary.generated += run.outcome.generated.len();
        summary.failures += run.outcome.failures.len();
        if config.write_nomenclatures {
            summary.written += write_back(&pool, &run.outcome).await;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use dcprism_core::parameter::{
        ExtractionSource, Parameter, ParameterCategory, ParameterType,
    };
    use dcprism_core::repository::InMemorySlotStore;
    use dcprism_core::slot::NomenclatureSlot;
    use dcprism_core::stats::HealthStatus;

    use super::*;

    fn parameter(id: i64, code: &str, name: &str) -> Parameter {
        Parameter {
            id,
            code: code.to_string(),
            name: name.to_string(),
            description: None,
            param_type: ParameterType::String,
            category: ParameterCategory::Metadata,
            is_required: false,
            is_active: true,
            is_system: false,
            possible_values: Vec::new(),
            extraction_source: ExtractionSource::Auto,
            extraction_pattern: None,
            format_rules: None,
            default_value: None,
        }
    }

    fn slot(id: i64, order: i32, parameter: Option<Parameter>, required: bool) -> NomenclatureSlot {
        NomenclatureSlot {
            id,
            festival_id: 1,
            parameter_id: parameter.as_ref().map(|p| p.id).or(Some(99)),
            parameter,
            order_position: order,
            is_active: true,
            is_required: required,
            separator: None,
            prefix: None,
            suffix: None,
            default_value: None,
        }
    }

    fn builder(slots: Vec<NomenclatureSlot>) -> NomenclatureBuilder {
        let store = InMemorySlotStore::new();
        store.set_slots(1, slots);
        NomenclatureBuilder::new(Arc::new(NomenclatureRepository::new(store)))
    }

    #[test]
    fn processes_festival() {
        let builder = builder(vec![
            slot(1, 1, Some(parameter(1, "TITLE", "Title")), false),
            slot(2, 2, Some(parameter(2, "YEAR", "Year")), true),
        ]);
        let movies = vec![
            Movie::new(10, "Oppenheimer").with_attribute("year", 2023),
            Movie::new(11, "Barbie"),
        ];
        let run = process_festival(&builder, Festival::new(1, "Cannes"), &movies).unwrap();

        assert_eq!(run.outcome.generated.len(), 2);
        assert_eq!(run.outcome.generated[0].nomenclature, "Oppenheimer_2023");
        assert_eq!(run.outcome.generated[1].nomenclature, "Barbie_YEAR");
        assert_eq!(run.stats.movies_with_complete_nomenclature, 1);
        assert_eq!(run.stats.movies_without_nomenclature, 1);
        assert_eq!(run.report.overall_health, HealthStatus::Fair);
        assert!(run.config_issues.is_empty());
    }

    #[test]
    fn reports_configuration_issues() {
        let builder = builder(vec![
            slot(1, 1, Some(parameter(1, "TITLE", "Title")), false),
            slot(2, 1, None, true),
        ]);
        let run = process_festival(&builder, Festival::new(1, "Cannes"), &[]).unwrap();
        assert_eq!(run.config_issues.len(), 2);
        assert_eq!(run.report.overall_health, HealthStatus::NoData);
    }
}
