use tk_store::ThreadStore;
use tk_types::ThreadRecord;
use tracing::debug;

use crate::error::Result;

/// One more than the largest alias on any record, or 1 if none has one.
///
/// Every record counts, open or not, so an alias still present on a closed
/// record is never handed out again before a reindex.
pub fn next_short_id(records: &[ThreadRecord]) -> u32 {
    records
        .iter()
        .filter_map(|r| r.short_id)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Give an open record without an alias the next free one, and save it.
///
/// Returns `true` if an alias was assigned. Records that are closed or
/// already aliased are left untouched and nothing is written.
pub fn ensure_short_id<S>(store: &S, record: &mut ThreadRecord) -> Result<bool>
where
    S: ThreadStore + ?Sized,
{
    if !record.is_active() || record.short_id.is_some() {
        return Ok(false);
    }
    let alias = next_short_id(&store.load_all()?);
    record.short_id = Some(alias);
    store.save(record)?;
    debug!(id = %record.id, alias, "assigned short_id");
    Ok(true)
}
