//! Content-addressed blob storage inside a thread directory.
//!
//! A blob is stored at `blobs/sha256/<h[0:2]>/<h[2:4]>/<h>` relative to the
//! thread directory, where `h` is the lowercase hex SHA-256 of its bytes.
//! Blobs are per thread: identical bytes attached to two threads are stored
//! twice.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::atomic::write_atomic;
use crate::error::{StoreError, StoreResult};

/// Directory under the thread directory that holds blobs.
pub const BLOBS_DIR: &str = "blobs";

/// Hash prefix characters consumed by the two fan-out directories.
const FANOUT_CHARS: usize = 4;

/// Hash algorithm of a blob reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobAlgo {
    Sha256,
}

impl BlobAlgo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for BlobAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlobAlgo {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            other => Err(StoreError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Reference to a stored blob, as recorded in attachment events.
///
/// `algo` stays a plain string on the wire so that events written by a newer
/// version with a different algorithm still decode; they simply fail to
/// resolve to a path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub algo: String,
    pub hash: String,
}

impl BlobRef {
    pub fn sha256(hash: impl Into<String>) -> Self {
        Self {
            algo: BlobAlgo::Sha256.as_str().to_string(),
            hash: hash.into(),
        }
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algo, self.hash)
    }
}

/// Result of [`store_blob`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub blob: BlobRef,
    pub size: u64,
    pub path: PathBuf,
    /// `false` when a file already existed at the hash path.
    pub created: bool,
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Store `data` under `thread_dir` and return its reference.
///
/// Idempotent: the same bytes always land at the same path, and an existing
/// file there is never rewritten; its size is reported as found. New blobs
/// go through a temp file plus rename, so a crash leaves either no file or a
/// complete one.
pub fn store_blob(thread_dir: &Path, data: &[u8]) -> StoreResult<StoredBlob> {
    let blob = BlobRef::sha256(sha256_hex(data));
    let path = locate_blob(thread_dir, &blob)?;

    if path.is_file() {
        // The file on disk is authoritative, including its size.
        let size = fs::metadata(&path).map_err(StoreError::io(&path))?.len();
        debug!(hash = %blob.hash, size, "blob already stored");
        return Ok(StoredBlob {
            blob,
            size,
            path,
            created: false,
        });
    }

    let size = data.len() as u64;
    write_atomic(&path, data)?;
    debug!(hash = %blob.hash, size, "stored blob");
    Ok(StoredBlob {
        blob,
        size,
        path,
        created: true,
    })
}

/// Path of a blob under `thread_dir`, or `None` if the reference cannot be
/// resolved (unknown algorithm, or a hash too short or not hex).
pub fn blob_path(thread_dir: &Path, blob: &BlobRef) -> Option<PathBuf> {
    locate_blob(thread_dir, blob).ok()
}

/// Like [`blob_path`] but explains why a reference does not resolve.
pub fn locate_blob(thread_dir: &Path, blob: &BlobRef) -> StoreResult<PathBuf> {
    let algo: BlobAlgo = blob.algo.parse()?;
    let hash = blob.hash.as_str();
    if hash.len() < FANOUT_CHARS {
        return Err(StoreError::MalformedHash {
            hash: hash.to_string(),
            reason: format!("shorter than {FANOUT_CHARS} characters"),
        });
    }
    // Hex only: anything else could escape the blob directory.
    if !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(StoreError::MalformedHash {
            hash: hash.to_string(),
            reason: "not hexadecimal".into(),
        });
    }
    Ok(thread_dir
        .join(BLOBS_DIR)
        .join(algo.as_str())
        .join(&hash[0..2])
        .join(&hash[2..4])
        .join(hash))
}

/// Read the bytes of a stored blob.
pub fn read_blob(thread_dir: &Path, blob: &BlobRef) -> StoreResult<Vec<u8>> {
    let path = locate_blob(thread_dir, blob)?;
    fs::read(&path).map_err(StoreError::io(path))
}
