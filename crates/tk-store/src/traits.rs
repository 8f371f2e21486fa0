use tk_types::{DurableId, ThreadRecord};

use crate::error::StoreResult;

/// Persistence boundary for thread records.
///
/// All implementations must satisfy these invariants:
/// - `load_all` returns every readable record, ordered by
///   `(created_at, id)` ascending.
/// - `save` replaces the whole record and preserves its unknown fields.
/// - A record's location is derived from its durable ID alone.
///
/// Implementations do not lock: concurrent writers may race, and the
/// allocator's reindex is the repair path for duplicate aliases.
pub trait ThreadStore: Send + Sync {
    /// All thread records, sorted by `(created_at, id)`.
    fn load_all(&self) -> StoreResult<Vec<ThreadRecord>>;

    /// Load one record. Returns `Ok(None)` if it does not exist.
    fn get(&self, id: &DurableId) -> StoreResult<Option<ThreadRecord>>;

    /// Write a record, creating its directory if needed.
    fn save(&self, record: &ThreadRecord) -> StoreResult<()>;

    /// Delete a thread and everything stored with it. Returns `true` if it
    /// existed.
    fn remove(&self, id: &DurableId) -> StoreResult<bool>;

    /// Save several records.
    ///
    /// Default implementation calls `save()` for each record and stops at
    /// the first failure.
    fn save_batch(&self, records: &[ThreadRecord]) -> StoreResult<()> {
        records.iter().try_for_each(|r| self.save(r))
    }
}

/// Sort records by `(created_at, id)` ascending, the canonical load order.
pub fn sort_records(records: &mut [ThreadRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
