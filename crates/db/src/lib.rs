//! Persistence for the DCPrism nomenclature engine.
//!
//! - [`repositories`]: zero-sized `XxxRepo` structs with async queries.
//! - [`models`]: row structs, DTOs and conversions into engine types.
//! - [`PgSlotStore`]: the engine's slot store over Postgres.
//! - [`config_service`]: guarded configuration writes with cache invalidation.

use sqlx::postgres::PgPoolOptions;

pub mod config_service;
pub mod models;
pub mod repositories;
pub mod slot_store;

pub use config_service::{ConfigError, NomenclatureConfigService};
pub use slot_store::PgSlotStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}
