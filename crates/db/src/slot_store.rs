//! Postgres-backed [`SlotStore`] for the synchronous nomenclature engine.

use dcprism_core::error::CoreError;
use dcprism_core::repository::SlotStore;
use dcprism_core::slot::NomenclatureSlot;
use dcprism_core::types::DbId;
use sqlx::PgPool;
use tokio::runtime::Handle;

use crate::repositories::NomenclatureRepo;

/// Reads slot configuration through [`NomenclatureRepo`].
///
/// The engine is synchronous, so each fetch blocks on the runtime `handle`.
/// Only call the engine from a blocking context (`spawn_blocking` or a plain
/// thread); blocking on a runtime worker thread panics.
#[derive(Debug, Clone)]
pub struct PgSlotStore {
    pool: PgPool,
    handle: Handle,
}

impl PgSlotStore {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self { pool, handle }
    }

    /// Store bound to the runtime this is called from.
    ///
    /// Fails outside of a Tokio runtime.
    pub fn from_current(pool: PgPool) -> Result<Self, CoreError> {
        let handle = Handle::try_current().map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(Self::new(pool, handle))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SlotStore for PgSlotStore {
    fn fetch_slots(
        &self,
        festival_id: DbId,
        active_only: bool,
    ) -> Result<Vec<NomenclatureSlot>, CoreError> {
        let rows = self
            .handle
            .block_on(NomenclatureRepo::list_for_festival(
                &self.pool,
                festival_id,
                active_only,
            ))
            .map_err(|e| {
                tracing::error!(festival_id, error = %e, "Failed to load nomenclature slots");
                CoreError::DataAccess(e.to_string())
            })?;
        Ok(rows.into_iter().map(|row| row.into_slot()).collect())
    }
}
