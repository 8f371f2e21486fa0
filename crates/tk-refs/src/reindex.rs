use tk_store::ThreadStore;
use tk_types::{DurableId, ThreadRecord};
use tracing::info;

use crate::error::Result;

/// An alias assignment that differs from what a record currently holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasChange {
    pub id: DurableId,
    pub from: Option<u32>,
    pub to: Option<u32>,
}

/// Outcome of [`reindex`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReindexReport {
    /// Open threads, now numbered `1..=active`.
    pub active: usize,
    /// Records whose alias actually changed and were saved.
    pub changed: usize,
}

/// Compute the alias every record should hold after a reindex.
///
/// Open records get `1..K` ordered by `(created_at, id)`; all others get no
/// alias. Only records whose alias would change are returned.
pub fn plan_reindex(records: &[ThreadRecord]) -> Vec<AliasChange> {
    let mut ordered: Vec<&ThreadRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut next = 1u32;
    let mut changes = Vec::new();
    for record in ordered {
        let to = if record.is_active() {
            let alias = next;
            next += 1;
            Some(alias)
        } else {
            None
        };
        if record.short_id != to {
            changes.push(AliasChange {
                id: record.id.clone(),
                from: record.short_id,
                to,
            });
        }
    }
    changes
}

/// Renumber aliases across the store and save the records that changed.
///
/// Idempotent: a second run plans no changes.
pub fn reindex<S>(store: &S) -> Result<ReindexReport>
where
    S: ThreadStore + ?Sized,
{
    let records = store.load_all()?;
    let changes = plan_reindex(&records);

    let updated: Vec<ThreadRecord> = changes
        .iter()
        .filter_map(|change| {
            records.iter().find(|r| r.id == change.id).map(|r| {
                let mut r = r.clone();
                r.short_id = change.to;
                r
            })
        })
        .collect();
    store.save_batch(&updated)?;

    let report = ReindexReport {
        active: records.iter().filter(|r| r.is_active()).count(),
        changed: updated.len(),
    };
    info!(active = report.active, changed = report.changed, "reindexed short_ids");
    Ok(report)
}
