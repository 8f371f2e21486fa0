use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid durable id {value:?}: {reason}")]
    InvalidId { value: String, reason: String },

    #[error("randomness source failed: {0}")]
    Entropy(String),

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid due date: {0}")]
    InvalidDate(String),

    #[error("unknown status {0:?} (expected open, done, or archived)")]
    UnknownStatus(String),

    #[error("unknown date locale {0:?} (expected iso, us, or eu)")]
    UnknownLocale(String),
}
