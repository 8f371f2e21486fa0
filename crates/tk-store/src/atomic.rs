use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};

/// Write `data` to `path` via a sibling temp file and a rename.
///
/// Readers observe either the old contents or the new ones, never a torn
/// file. The parent directory is created if needed.
pub fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Serialization(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir).map_err(StoreError::io(dir))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(StoreError::io(dir))?;
    tmp.write_all(data).map_err(StoreError::io(tmp.path()))?;
    tmp.flush().map_err(StoreError::io(tmp.path()))?;
    // A failed persist drops the temp file, which removes it.
    tmp.persist(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/file.json");

        write_atomic(&path, b"one").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"one");

        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");

        // Only the target remains; no temp files are left behind.
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
