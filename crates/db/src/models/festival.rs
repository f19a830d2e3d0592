//! Models for the `festivals` table.

use dcprism_core::movie::Festival;
use dcprism_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `festivals` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FestivalRow {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<FestivalRow> for Festival {
    fn from(row: FestivalRow) -> Self {
        Festival::new(row.id, row.name)
    }
}
