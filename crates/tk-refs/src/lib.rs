//! Thread references for Threadkeeper.
//!
//! A thread can be named two ways: by its durable ID, which never changes,
//! or by a short alias, a small integer carried only while the thread is
//! open. This crate allocates aliases, resolves either form to a record, and
//! renumbers aliases on demand.
//!
//! # Architecture
//!
//! - **Allocation** is a full scan: the next alias is one more than the
//!   largest alias on any record. No counter is persisted.
//! - **Resolution** tries the durable ID first, then the alias among open
//!   threads. Two open threads sharing an alias is reported as ambiguous,
//!   never guessed.
//! - **Reindex** renumbers open threads to `1..K` in creation order and
//!   strips aliases from the rest. It is the repair path for alias drift.
//!
//! None of this takes a lock. Two processes allocating at once can hand out
//! the same alias; the next resolution of it reports ambiguity and a reindex
//! fixes it.
//!
//! # Modules
//!
//! - [`error`] — Error types for reference operations
//! - [`alias`] — [`next_short_id`] and [`ensure_short_id`]
//! - [`resolve`] — [`resolve`](resolve::resolve) for user-supplied tokens
//! - [`reindex`] — [`plan_reindex`] and [`reindex`](reindex::reindex)

pub mod alias;
pub mod error;
pub mod reindex;
pub mod resolve;

pub use alias::{ensure_short_id, next_short_id};
pub use error::{RefError, Result};
pub use reindex::{plan_reindex, reindex, AliasChange, ReindexReport};
pub use resolve::resolve;
