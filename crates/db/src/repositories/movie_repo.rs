//! Repository for festival movies and their stored parameter values.

use dcprism_core::movie::Movie;
use dcprism_core::types::DbId;
use sqlx::PgPool;

use crate::models::movie::{MovieParameterValueRow, MovieRow};

/// Read access to festival movies, plus nomenclature write-back.
pub struct MovieRepo;

impl MovieRepo {
    /// Movies attached to a festival, ordered by id.
    pub async fn list_rows_for_festival(
        pool: &PgPool,
        festival_id: DbId,
    ) -> Result<Vec<MovieRow>, sqlx::Error> {
        sqlx::query_as::<_, MovieRow>(
            "SELECT m.id, m.title, to_jsonb(m) AS attributes \
             FROM movies m \
             JOIN festival_movie fm ON fm.movie_id = m.id \
             WHERE fm.festival_id = $1 \
             ORDER BY m.id",
        )
        .bind(festival_id)
        .fetch_all(pool)
        .await
    }

    /// Stored parameter values for a set of movies.
    pub async fn list_parameter_values(
        pool: &PgPool,
        movie_ids: &[DbId],
    ) -> Result<Vec<MovieParameterValueRow>, sqlx::Error> {
        sqlx::query_as::<_, MovieParameterValueRow>(
            "SELECT mp.movie_id, p.code, mp.value \
             FROM movie_parameters mp \
             JOIN parameters p ON p.id = mp.parameter_id \
             WHERE mp.movie_id = ANY($1)",
        )
        .bind(movie_ids)
        .fetch_all(pool)
        .await
    }

    /// Movies attached to a festival, converted for the engine with their
    /// stored parameter values.
    pub async fn list_for_festival(
        pool: &PgPool,
        festival_id: DbId,
    ) -> Result<Vec<Movie>, sqlx::Error> {
        let rows = Self::list_rows_for_festival(pool, festival_id).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let values = Self::list_parameter_values(pool, &ids).await?;
        Ok(rows.into_iter().map(|row| row.into_movie(&values)).collect())
    }

    /// Store a generated nomenclature. Returns `true` if the movie exists.
    pub async fn update_nomenclature(
        pool: &PgPool,
        movie_id: DbId,
        nomenclature: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE movies SET nomenclature = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(movie_id)
        .bind(nomenclature)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
