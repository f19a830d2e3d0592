//! Nomenclature configuration repository with per-festival caching.
//!
//! ```text
//!   NomenclatureBuilder
//!          |
//!          v
//!   SlotRepository (trait)  <-- NomenclatureRepository<S, C>
//!                                   |                 |
//!                                   v                 v
//!                              SlotStore         CacheStore
//!                          (db, in-memory)   (memory TTL, none)
//! ```
//!
//! Active slot lists are cached per festival for [`DEFAULT_CACHE_TTL`] under
//! [`cache_key`]. Writes to slot configuration do not invalidate the cache on
//! their own: every mutation path must call
//! [`SlotRepository::clear_cache`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use moka::sync::Cache;

use crate::error::CoreError;
use crate::slot::NomenclatureSlot;
use crate::types::DbId;

/// How long an active slot list stays cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Longest TTL a [`MemoryCacheStore`] accepts; longer values are clamped.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Upper bound on festivals held by a [`MemoryCacheStore`].
pub const MAX_CACHED_FESTIVALS: u64 = 10_000;

/// Shared, immutable slot list handed out by the repository.
pub type SlotList = Arc<Vec<NomenclatureSlot>>;

/// Cache key for a festival's active slots.
pub fn cache_key(festival_id: DbId) -> String {
    format!("nomenclature_active_{festival_id}")
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Backing data for slot configuration.
///
/// Implementations return the festival's slots with their parameters loaded.
/// Ordering and active filtering are applied by the repository.
pub trait SlotStore: Send + Sync {
    fn fetch_slots(
        &self,
        festival_id: DbId,
        active_only: bool,
    ) -> Result<Vec<NomenclatureSlot>, CoreError>;
}

/// Key/value cache with delete-by-key. Expiry is the store's concern.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<SlotList>;
    fn put(&self, key: &str, value: SlotList);
    /// Remove `key`, returning whether an entry existed.
    fn forget(&self, key: &str) -> bool;
}

/// Read access to a festival's nomenclature configuration.
pub trait SlotRepository: Send + Sync {
    /// Active slots ordered by `order_position`, ties in insertion order.
    fn get_active_nomenclatures(&self, festival_id: DbId) -> Result<SlotList, CoreError>;

    /// Drop any cached configuration for the festival.
    fn clear_cache(&self, festival_id: DbId);

    /// All slots (`active_only = false`, uncached) or the cached active list.
    fn get_nomenclatures(
        &self,
        festival_id: DbId,
        active_only: bool,
    ) -> Result<SlotList, CoreError>;
}

// ---------------------------------------------------------------------------
// Cache stores
// ---------------------------------------------------------------------------

/// In-process TTL cache backed by `moka`.
///
/// Expired entries are dropped by moka's own housekeeping, not only when
/// their key is read again. The TTL is clamped to [`MAX_CACHE_TTL`].
#[derive(Debug, Clone)]
pub struct MemoryCacheStore {
    inner: Cache<String, SlotList>,
}

impl MemoryCacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_CACHED_FESTIVALS)
                .time_to_live(ttl.min(MAX_CACHE_TTL))
                .build(),
        }
    }

    /// Number of live entries, after pending evictions have run.
    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        self.inner.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<SlotList> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: SlotList) {
        self.inner.insert(key.to_string(), value);
    }

    fn forget(&self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }
}

/// Disables caching: every read goes to the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl CacheStore for NoCache {
    fn get(&self, _key: &str) -> Option<SlotList> {
        None
    }

    fn put(&self, _key: &str, _value: SlotList) {}

    fn forget(&self, _key: &str) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Slot stores
// ---------------------------------------------------------------------------

/// Slot configuration held in memory, keyed by festival.
///
/// Used for preloaded snapshots and tests. Slots keep their insertion order.
#[derive(Debug, Default)]
pub struct InMemorySlotStore {
    slots: RwLock<HashMap<DbId, Vec<NomenclatureSlot>>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a festival's slots.
    pub fn set_slots(&self, festival_id: DbId, slots: Vec<NomenclatureSlot>) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(festival_id, slots);
    }

    /// Append one slot to its festival's configuration.
    pub fn push_slot(&self, slot: NomenclatureSlot) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(slot.festival_id)
            .or_default()
            .push(slot);
    }
}

impl SlotStore for InMemorySlotStore {
    fn fetch_slots(
        &self,
        festival_id: DbId,
        active_only: bool,
    ) -> Result<Vec<NomenclatureSlot>, CoreError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots
            .get(&festival_id)
            .map(|list| {
                list.iter()
                    .filter(|s| !active_only || s.is_active)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Cache-or-fetch repository over a [`SlotStore`].
#[derive(Debug)]
pub struct NomenclatureRepository<S, C = MemoryCacheStore> {
    store: S,
    cache: C,
}

impl<S: SlotStore> NomenclatureRepository<S, MemoryCacheStore> {
    /// Repository with an in-process cache and the default TTL.
    pub fn new(store: S) -> Self {
        Self::with_cache(store, MemoryCacheStore::default())
    }
}

impl<S: SlotStore, C: CacheStore> NomenclatureRepository<S, C> {
    pub fn with_cache(store: S, cache: C) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn load(&self, festival_id: DbId, active_only: bool) -> Result<Vec<NomenclatureSlot>, CoreError> {
        let mut slots = self.store.fetch_slots(festival_id, active_only)?;
        if active_only {
            slots.retain(|s| s.is_active);
        }
        // Stable sort keeps insertion order for equal positions.
        slots.sort_by_key(|s| s.order_position);
        Ok(slots)
    }
}

impl<S: SlotStore, C: CacheStore> SlotRepository for NomenclatureRepository<S, C> {
    fn get_active_nomenclatures(&self, festival_id: DbId) -> Result<SlotList, CoreError> {
        let key = cache_key(festival_id);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let slots: SlotList = Arc::new(self.load(festival_id, true)?);
        tracing::debug!(
            festival_id,
            slot_count = slots.len(),
            "Loaded active nomenclature configuration"
        );
        self.cache.put(&key, Arc::clone(&slots));
        Ok(slots)
    }

    fn clear_cache(&self, festival_id: DbId) {
        if self.cache.forget(&cache_key(festival_id)) {
            tracing::debug!(festival_id, "Cleared nomenclature cache");
        }
    }

    fn get_nomenclatures(
        &self,
        festival_id: DbId,
        active_only: bool,
    ) -> Result<SlotList, CoreError> {
        if active_only {
            self.get_active_nomenclatures(festival_id)
        } else {
            Ok(Arc::new(self.load(festival_id, false)?))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Wraps a store and counts fetches.
    #[derive(Debug, Default)]
    pub struct CountingStore {
        pub inner: InMemorySlotStore,
        pub fetches: AtomicUsize,
    }

    impl CountingStore {
        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl SlotStore for CountingStore {
        fn fetch_slots(
            &self,
            festival_id: DbId,
            active_only: bool,
        ) -> Result<Vec<NomenclatureSlot>, CoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_slots(festival_id, active_only)
        }
    }

    /// A store whose backend is always down.
    #[derive(Debug, Default)]
    pub struct FailingStore;

    impl SlotStore for FailingStore {
        fn fetch_slots(
            &self,
            _festival_id: DbId,
            _active_only: bool,
        ) -> Result<Vec<NomenclatureSlot>, CoreError> {
            Err(CoreError::DataAccess("connection refused".to_string()))
        }
    }
}
