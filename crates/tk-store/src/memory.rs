use std::collections::HashMap;
use std::sync::RwLock;

use tk_types::{DurableId, ThreadRecord};

use crate::error::StoreResult;
use crate::traits::{sort_records, ThreadStore};

/// In-memory thread store.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` and
/// cloned on read and write.
pub struct InMemoryThreadStore {
    records: RwLock<HashMap<DurableId, ThreadRecord>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = ThreadRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write().expect("lock poisoned");
            for record in records {
                map.insert(record.id.clone(), record);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadStore for InMemoryThreadStore {
    fn load_all(&self) -> StoreResult<Vec<ThreadRecord>> {
        let map = self.records.read().expect("lock poisoned");
        let mut records: Vec<ThreadRecord> = map.values().cloned().collect();
        sort_records(&mut records);
        Ok(records)
    }

    fn get(&self, id: &DurableId) -> StoreResult<Option<ThreadRecord>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn save(&self, record: &ThreadRecord) -> StoreResult<()> {
        let mut map = self.records.write().expect("lock poisoned");
        map.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, id: &DurableId) -> StoreResult<bool> {
        let mut map = self.records.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }
}
