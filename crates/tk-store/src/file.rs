use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tk_types::temporal::format_timestamp;
use tk_types::{DurableId, ThreadRecord};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::atomic::write_atomic;
use crate::error::{StoreError, StoreResult};
use crate::shard::{shard_path, thread_file, THREAD_FILE};
use crate::traits::{sort_records, ThreadStore};

/// Depth of `thread.json` below the root: `<bucket>/<id>/thread.json`.
const RECORD_DEPTH: usize = 3;

/// File-backed thread store rooted at the thread-collection directory.
#[derive(Clone, Debug)]
pub struct FileThreadStore {
    root: PathBuf,
}

impl FileThreadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that holds everything belonging to `id`.
    pub fn thread_dir(&self, id: &DurableId) -> PathBuf {
        shard_path(&self.root, id)
    }

    /// Read-modify-write the raw JSON object of a record.
    ///
    /// The record is decoded into an untyped map, so keys this version does
    /// not model are written back exactly as found. The write is atomic.
    pub fn patch_raw<F>(&self, id: &DurableId, patch: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let path = thread_file(&self.root, id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::ThreadNotFound(id.clone()));
            }
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        let mut object: Map<String, Value> =
            serde_json::from_slice(&data).map_err(|source| StoreError::Decode {
                path: path.clone(),
                source,
            })?;
        patch(&mut object);
        write_atomic(&path, &encode(&object)?)?;
        debug!(id = %id, "patched thread record");
        Ok(())
    }

    /// Record that `log_name` exists for `id` and refresh `updated_at`.
    pub fn mark_attachments_log(
        &self,
        id: &DurableId,
        log_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.patch_raw(id, |object| {
            object.insert("attachments_log".into(), Value::String(log_name.into()));
            object.insert("updated_at".into(), Value::String(format_timestamp(&now)));
        })
    }

    fn read_record(&self, path: &Path) -> StoreResult<ThreadRecord> {
        let data = fs::read(path).map_err(StoreError::io(path))?;
        ThreadRecord::from_json(&data).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    let mut data =
        serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    data.push(b'\n');
    Ok(data)
}

impl ThreadStore for FileThreadStore {
    fn load_all(&self) -> StoreResult<Vec<ThreadRecord>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(RECORD_DEPTH)
            .max_depth(RECORD_DEPTH)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || entry.file_name() != THREAD_FILE {
                continue;
            }
            let path = entry.path();
            let record = match self.read_record(path) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping thread record");
                    continue;
                }
            };
            // A record must live where its own ID says it lives.
            let expected = thread_file(&self.root, &record.id);
            if expected != path {
                warn!(id = %record.id, path = %path.display(), "skipping misplaced thread record");
                continue;
            }
            records.push(record);
        }

        sort_records(&mut records);
        Ok(records)
    }

    fn get(&self, id: &DurableId) -> StoreResult<Option<ThreadRecord>> {
        let path = thread_file(&self.root, id);
        if !path.is_file() {
            return Ok(None);
        }
        self.read_record(&path).map(Some)
    }

    fn save(&self, record: &ThreadRecord) -> StoreResult<()> {
        let path = thread_file(&self.root, &record.id);
        write_atomic(&path, &encode(record)?)?;
        debug!(id = %record.id, "saved thread record");
        Ok(())
    }

    fn remove(&self, id: &DurableId) -> StoreResult<bool> {
        let dir = self.thread_dir(id);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(StoreError::io(&dir))?;
        // Drop the bucket too once its last thread is gone.
        if let Some(bucket) = dir.parent() {
            let _ = fs::remove_dir(bucket);
        }
        debug!(id = %id, "removed thread directory");
        Ok(true)
    }
}
