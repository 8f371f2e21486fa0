use std::path::PathBuf;

use thiserror::Error;
use tk_ledger::LedgerError;
use tk_refs::RefError;
use tk_store::StoreError;
use tk_types::TypeError;

/// Coarse failure class, for callers that map errors to exit codes or
/// user-facing hints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown durable ID, alias, attachment, or workspace.
    NotFound,
    /// An alias matched more than one open thread.
    Ambiguous,
    /// The caller supplied something unusable.
    InvalidInput,
    /// Read, write, or rename failed.
    Io,
    /// A persisted file could not be decoded.
    Parse,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("threads directory does not exist at {}; run 'tk init' first", .0.display())]
    NotInitialized(PathBuf),

    #[error("attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("cannot determine home directory")]
    NoHome,

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Types(#[from] TypeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Ref(#[from] RefError),
}

impl SdkError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized(_) | Self::AttachmentNotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) | Self::NoHome => ErrorKind::InvalidInput,
            Self::Config { .. } => ErrorKind::Parse,
            Self::Io { .. } => ErrorKind::Io,
            Self::Types(TypeError::Entropy(_)) => ErrorKind::Io,
            Self::Types(_) => ErrorKind::InvalidInput,
            Self::Store(e) => store_kind(e),
            Self::Ledger(LedgerError::Io { .. }) => ErrorKind::Io,
            Self::Ledger(LedgerError::Serialization(_)) => ErrorKind::Parse,
            Self::Ref(RefError::UnknownToken { .. } | RefError::AliasNotFound { .. }) => {
                ErrorKind::NotFound
            }
            Self::Ref(RefError::Ambiguous { .. }) => ErrorKind::Ambiguous,
            Self::Ref(RefError::Store(e)) => store_kind(e),
        }
    }
}

fn store_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::Io { .. } => ErrorKind::Io,
        StoreError::Decode { .. } | StoreError::Serialization(_) => ErrorKind::Parse,
        StoreError::UnsupportedAlgorithm(_) | StoreError::MalformedHash { .. } => {
            ErrorKind::InvalidInput
        }
        StoreError::ThreadNotFound(_) => ErrorKind::NotFound,
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
