//! Repository for the `nomenclatures` table.
//!
//! Every write returns the owning festival id so the caller can invalidate
//! that festival's cached configuration.

use dcprism_core::types::DbId;
use sqlx::PgPool;

use crate::models::nomenclature::{
    CreateNomenclature, NomenclatureRow, NomenclatureWithParameterRow, UpdateNomenclature,
};

/// Column list for plain `nomenclatures` queries.
const COLUMNS: &str = "id, festival_id, parameter_id, order_position, is_active, is_required, \
     separator, prefix, suffix, default_value, created_at, updated_at";

/// Column list for slot queries joined with `parameters`.
const JOINED_COLUMNS: &str = "n.id, n.festival_id, n.parameter_id, n.order_position, \
     n.is_active, n.is_required, n.separator, n.prefix, n.suffix, n.default_value, \
     n.created_at, n.updated_at, \
     p.id AS p_id, p.code AS p_code, p.name AS p_name, p.description AS p_description, \
     p.param_type AS p_param_type, p.category AS p_category, \
     p.is_required AS p_is_required, p.is_active AS p_is_active, \
     p.is_system AS p_is_system, p.possible_values AS p_possible_values, \
     p.extraction_source AS p_extraction_source, \
     p.extraction_pattern AS p_extraction_pattern, p.format_rules AS p_format_rules, \
     p.default_value AS p_default_value, p.created_at AS p_created_at, \
     p.updated_at AS p_updated_at";

/// Provides CRUD operations for festival nomenclature slots.
pub struct NomenclatureRepo;

impl NomenclatureRepo {
    /// List a festival's slots with their parameters, ordered by position.
    pub async fn list_for_festival(
        pool: &PgPool,
        festival_id: DbId,
        active_only: bool,
    ) -> Result<Vec<NomenclatureWithParameterRow>, sqlx::Error> {
        let active_clause = if active_only {
            "AND n.is_active = true "
        } else {
            ""
        };
        let query = format!(
            "SELECT {JOINED_COLUMNS} \
             FROM nomenclatures n \
             LEFT JOIN parameters p ON p.id = n.parameter_id \
             WHERE n.festival_id = $1 \
               {active_clause}\
             ORDER BY n.order_position, n.id"
        );
        sqlx::query_as::<_, NomenclatureWithParameterRow>(&query)
            .bind(festival_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NomenclatureRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nomenclatures WHERE id = $1");
        sqlx::query_as::<_, NomenclatureRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new slot, returning the created row.
    ///
    /// If `order_position` is `None`, the slot is appended after the
    /// festival's current last position.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNomenclature,
    ) -> Result<NomenclatureRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO nomenclatures
                (festival_id, parameter_id, order_position, is_active, is_required,
                 separator, prefix, suffix, default_value)
             VALUES ($1, $2,
                     COALESCE($3, (SELECT COALESCE(MAX(order_position), 0) + 1
                                   FROM nomenclatures WHERE festival_id = $1)),
                     COALESCE($4, true), COALESCE($5, false), $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NomenclatureRow>(&query)
            .bind(input.festival_id)
            .bind(input.parameter_id)
            .bind(input.order_position)
            .bind(input.is_active)
            .bind(input.is_required)
            .bind(&input.separator)
            .bind(&input.prefix)
            .bind(&input.suffix)
            .bind(&input.default_value)
            .fetch_one(pool)
            .await
    }

    /// Update a slot. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateNomenclature,
    ) -> Result<Option<NomenclatureRow>, sqlx::Error> {
        let query = format!(
            "UPDATE nomenclatures SET
                parameter_id = COALESCE($2, parameter_id),
                order_position = COALESCE($3, order_position),
                is_active = COALESCE($4, is_active),
                is_required = COALESCE($5, is_required),
                separator = COALESCE($6, separator),
                prefix = COALESCE($7, prefix),
                suffix = COALESCE($8, suffix),
                default_value = COALESCE($9, default_value),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NomenclatureRow>(&query)
            .bind(id)
            .bind(input.parameter_id)
            .bind(input.order_position)
            .bind(input.is_active)
            .bind(input.is_required)
            .bind(&input.separator)
            .bind(&input.prefix)
            .bind(&input.suffix)
            .bind(&input.default_value)
            .fetch_optional(pool)
            .await
    }

    /// Festivals with at least one slot referencing the parameter.
    pub async fn festival_ids_for_parameter(
        pool: &PgPool,
        parameter_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT DISTINCT festival_id FROM nomenclatures WHERE parameter_id = $1 \
             ORDER BY festival_id",
        )
        .bind(parameter_id)
        .fetch_all(pool)
        .await
    }

    /// Delete a slot. Returns the owning festival id if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "DELETE FROM nomenclatures WHERE id = $1 RETURNING festival_id",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
