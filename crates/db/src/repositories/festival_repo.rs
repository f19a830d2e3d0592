//! Repository for the `festivals` table (read-only here).

use dcprism_core::types::DbId;
use sqlx::PgPool;

use crate::models::festival::FestivalRow;

const COLUMNS: &str = "id, name, is_active, created_at, updated_at";

/// Read access to festivals.
pub struct FestivalRepo;

impl FestivalRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FestivalRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM festivals WHERE id = $1");
        sqlx::query_as::<_, FestivalRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List active festivals ordered by name.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<FestivalRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM festivals WHERE is_active = true ORDER BY name, id");
        sqlx::query_as::<_, FestivalRow>(&query).fetch_all(pool).await
    }
}
