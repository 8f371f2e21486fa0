//! Error types for reference operations.

use thiserror::Error;
use tk_store::StoreError;
use tk_types::DurableId;

/// Errors that can occur while resolving or allocating references.
#[derive(Debug, Error)]
pub enum RefError {
    /// The token is neither a known durable ID nor a number.
    #[error("'{token}' is not a valid thread ID or short_id")]
    UnknownToken { token: String },

    /// No open thread carries this alias.
    #[error("no active thread with short_id {alias} (use durable ID for closed threads)")]
    AliasNotFound { alias: u32 },

    /// More than one open thread carries this alias.
    #[error("short_id {alias} refers to multiple threads (run reindex or use durable ID)")]
    Ambiguous { alias: u32, matches: Vec<DurableId> },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RefError {
    /// Whether this error means "nothing matched the token".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownToken { .. } | Self::AliasNotFound { .. })
    }
}

/// Convenience type alias for reference operations.
pub type Result<T> = std::result::Result<T, RefError>;
