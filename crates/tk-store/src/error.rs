use std::io;
use std::path::PathBuf;

use tk_types::DurableId;

/// Errors from thread and blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure, with the path that was being touched.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A persisted file could not be decoded.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failure while preparing a write.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Blob reference names a hash algorithm this store cannot resolve.
    #[error("unsupported blob algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    /// Blob reference carries a hash that cannot be mapped to a path.
    #[error("malformed blob hash {hash:?}: {reason}")]
    MalformedHash { hash: String, reason: String },

    /// No record exists for the durable ID.
    #[error("thread not found: {0}")]
    ThreadNotFound(DurableId),
}

impl StoreError {
    /// Adapter for `map_err` that attaches `path` to an I/O error.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
