//! Attachment ledger for Threadkeeper threads.
//!
//! Each thread keeps an append-only `attachments.jsonl` next to its
//! `thread.json`. Every line is one self-contained [`AttachmentEvent`]; there
//! is no header and no index. The set of attachments a thread currently has
//! is never stored: it is derived by replaying the log with
//! [`compute_current`].
//!
//! # Key Types
//!
//! - [`AttachmentEvent`] — one `add` or `remove` with a full metadata snapshot
//! - [`Attachment`] — note or link metadata carried by an event
//! - [`LoadedEvents`] — the events of a log plus the count of skipped lines
//! - [`CurrentAttachment`] — a surviving attachment after replay

pub mod error;
pub mod event;
pub mod log;
pub mod replay;

pub use error::{LedgerError, LedgerResult};
pub use event::{Attachment, AttachmentEvent, AttachmentKind, Op};
pub use log::{append_event, ledger_path, load_events, LoadedEvents, LEDGER_FILE};
pub use replay::{compute_current, CurrentAttachment};
