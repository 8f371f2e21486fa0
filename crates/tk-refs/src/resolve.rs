use tk_store::ThreadStore;
use tk_types::{DurableId, ThreadRecord};

use crate::alias::ensure_short_id;
use crate::error::{RefError, Result};

/// Resolve a user-supplied token to a thread record.
///
/// The token is first tried as a durable ID. Failing that, it is parsed as
/// an integer and matched against the aliases of open threads only. A
/// resolved open thread without an alias is given one before returning.
pub fn resolve<S>(store: &S, token: &str) -> Result<ThreadRecord>
where
    S: ThreadStore + ?Sized,
{
    let token = token.trim();

    if let Ok(id) = DurableId::parse(token) {
        if let Some(mut record) = store.get(&id)? {
            ensure_short_id(store, &mut record)?;
            return Ok(record);
        }
    }

    let alias: u32 = token.parse().map_err(|_| RefError::UnknownToken {
        token: token.to_string(),
    })?;

    let mut matches: Vec<ThreadRecord> = store
        .load_all()?
        .into_iter()
        .filter(|r| r.is_active() && r.short_id == Some(alias))
        .collect();

    let mut record = match matches.len() {
        0 => return Err(RefError::AliasNotFound { alias }),
        1 => matches.remove(0),
        _ => {
            return Err(RefError::Ambiguous {
                alias,
                matches: matches.into_iter().map(|r| r.id).collect(),
            })
        }
    };
    ensure_short_id(store, &mut record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tk_store::InMemoryThreadStore;
    use tk_types::ThreadStatus;

    fn record(id: &str, alias: Option<u32>, status: ThreadStatus) -> ThreadRecord {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut r = ThreadRecord::new(DurableId::parse(id).unwrap(), id, ts);
        r.short_id = alias;
        r.status = status;
        r
    }

    fn store() -> InMemoryThreadStore {
        InMemoryThreadStore::with_records([
            record("01HVAAAA", Some(1), ThreadStatus::Open),
            record("01HVBBBB", Some(2), ThreadStatus::Open),
            record("01HVCCCC", None, ThreadStatus::Done),
            record("01HVDDDD", None, ThreadStatus::Open),
        ])
    }

    #[test]
    fn durable_id_resolves_any_status() {
        let found = resolve(&store(), "01HVCCCC").unwrap();
        assert_eq!(found.status, ThreadStatus::Done);
        assert_eq!(found.short_id, None);
    }

    #[test]
    fn alias_resolves_open_thread() {
        let found = resolve(&store(), " 2 ").unwrap();
        assert_eq!(found.id.as_str(), "01HVBBBB");
    }

    #[test]
    fn alias_of_closed_thread_is_not_found() {
        let store = InMemoryThreadStore::with_records([record("01HVAAAA", Some(5), ThreadStatus::Done)]);
        let err = resolve(&store, "5").unwrap_err();
        assert!(matches!(err, RefError::AliasNotFound { alias: 5 }));
        assert!(err.is_not_found());
    }

    #[test]
    fn non_numeric_unknown_token_is_not_found() {
        let err = resolve(&store(), "nosuchthread").unwrap_err();
        assert!(matches!(err, RefError::UnknownToken { .. }));
        assert!(err.is_not_found());

        let err = resolve(&store(), "../x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_alias_is_ambiguous() {
        let store = InMemoryThreadStore::with_records([
            record("01HVAAAA", Some(4), ThreadStatus::Open),
            record("01HVBBBB", Some(4), ThreadStatus::Open),
        ]);
        match resolve(&store, "4").unwrap_err() {
            RefError::Ambiguous { alias, matches } => {
                assert_eq!(alias, 4);
                assert_eq!(matches.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolving_open_thread_assigns_missing_alias() {
        let store = store();
        let found = resolve(&store, "01HVDDDD").unwrap();
        assert_eq!(found.short_id, Some(3));
        let saved = store.get(&found.id).unwrap().unwrap();
        assert_eq!(saved.short_id, Some(3));
    }
}
