//! Foundation types for Threadkeeper.
//!
//! This crate provides the identity, record, and temporal types shared by
//! every other Threadkeeper crate.
//!
//! # Key Types
//!
//! - [`DurableId`] — Permanent, time-sortable identifier for threads and attachments
//! - [`ThreadRecord`] — Persisted thread metadata plus an extension bag of unknown fields
//! - [`ThreadStatus`] — Lifecycle state (`open` is the active state)
//! - [`DateLocale`] — Interpretation of numeric due-date tokens

pub mod due;
pub mod error;
pub mod identity;
pub mod record;
pub mod temporal;

pub use due::{parse_due, DateLocale};
pub use error::TypeError;
pub use identity::{abbreviate, DurableId};
pub use record::{normalize_tags, ThreadRecord, ThreadStatus};
