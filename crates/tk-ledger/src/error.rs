use std::io;
use std::path::PathBuf;

/// Errors produced by ledger operations.
///
/// A malformed line is not an error: [`load_events`](crate::load_events)
/// skips and counts it.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error on ledger {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
