use std::path::{Path, PathBuf};

use tk_types::DurableId;

/// File name of the persisted record inside a thread directory.
pub const THREAD_FILE: &str = "thread.json";

/// Directory of a thread: `root / bucket(id) / id`.
///
/// `bucket(id)` is the first two characters of the durable ID. This is a pure
/// function and must never change once data exists under it: there is no
/// separate index, so it is the only way to locate a thread.
pub fn shard_path(root: &Path, id: &DurableId) -> PathBuf {
    root.join(id.bucket()).join(id.as_str())
}

/// Path of `thread.json` for a thread.
pub fn thread_file(root: &Path, id: &DurableId) -> PathBuf {
    shard_path(root, id).join(THREAD_FILE)
}
