//! Repository for the `parameters` catalog.

use dcprism_core::types::DbId;
use sqlx::PgPool;

use crate::models::parameter::{CreateParameter, ParameterRow, UpdateParameter};

/// Column list shared across queries.
const COLUMNS: &str = "id, code, name, description, param_type, category, is_required, \
     is_active, is_system, possible_values, extraction_source, extraction_pattern, \
     format_rules, default_value, created_at, updated_at";

/// Provides CRUD operations for parameters.
pub struct ParameterRepo;

impl ParameterRepo {
    /// List all parameters, ordered by category then name.
    pub async fn list(pool: &PgPool) -> Result<Vec<ParameterRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parameters ORDER BY category, name");
        sqlx::query_as::<_, ParameterRow>(&query).fetch_all(pool).await
    }

    /// List active parameters, ordered by category then name.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<ParameterRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM parameters WHERE is_active = true ORDER BY category, name"
        );
        sqlx::query_as::<_, ParameterRow>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ParameterRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parameters WHERE id = $1");
        sqlx::query_as::<_, ParameterRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<ParameterRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parameters WHERE code = $1");
        sqlx::query_as::<_, ParameterRow>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new parameter, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateParameter,
    ) -> Result<ParameterRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO parameters
                (code, name, description, param_type, category, is_required, is_active,
                 is_system, possible_values, extraction_source, extraction_pattern,
                 format_rules, default_value)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, false), COALESCE($7, true),
                     COALESCE($8, false), $9, $10, $11, $12, $13)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ParameterRow>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.param_type)
            .bind(&input.category)
            .bind(input.is_required)
            .bind(input.is_active)
            .bind(input.is_system)
            .bind(input.possible_values.as_ref().map(|v| serde_json::json!(v)))
            .bind(&input.extraction_source)
            .bind(&input.extraction_pattern)
            .bind(&input.format_rules)
            .bind(&input.default_value)
            .fetch_one(pool)
            .await
    }

    /// Update a parameter. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateParameter,
    ) -> Result<Option<ParameterRow>, sqlx::Error> {
        let query = format!(
            "UPDATE parameters SET
                code = COALESCE($2, code),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                is_required = COALESCE($6, is_required),
                is_active = COALESCE($7, is_active),
                possible_values = COALESCE($8, possible_values),
                extraction_source = COALESCE($9, extraction_source),
                extraction_pattern = COALESCE($10, extraction_pattern),
                format_rules = COALESCE($11, format_rules),
                default_value = COALESCE($12, default_value),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ParameterRow>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.is_required)
            .bind(input.is_active)
            .bind(input.possible_values.as_ref().map(|v| serde_json::json!(v)))
            .bind(&input.extraction_source)
            .bind(&input.extraction_pattern)
            .bind(&input.format_rules)
            .bind(&input.default_value)
            .fetch_optional(pool)
            .await
    }

    /// Number of nomenclature slots referencing the parameter.
    pub async fn count_referencing_slots(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM nomenclatures WHERE parameter_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Delete a parameter that no slot references. Returns `true` if a row
    /// was removed.
    ///
    /// The reference check runs in the same statement, so a slot created
    /// concurrently cannot be left dangling.
    pub async fn delete_unreferenced(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM parameters p
             WHERE p.id = $1
               AND NOT EXISTS (SELECT 1 FROM nomenclatures n WHERE n.parameter_id = p.id)",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
