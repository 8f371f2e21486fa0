//! High-level SDK for Threadkeeper.
//!
//! [`Workspace`] is the entry point: it resolves thread tokens, runs the
//! thread lifecycle, and writes attachments through the blob store and the
//! ledger. Configuration loading and workspace path resolution live in
//! [`config`].

pub mod attach;
pub mod config;
pub mod error;
pub mod workspace;

pub use attach::{Attached, AttachmentSelector, AttachmentTarget, ThreadView, NOTE_MEDIA_TYPE};
pub use config::{resolve_workspace, Config, Environment, WorkspacePaths};
pub use error::{ErrorKind, SdkError, SdkResult};
pub use workspace::{Change, InitReport, ListFilter, NewThread, ThreadUpdate, Workspace};

// Re-export key types
pub use tk_ledger::{Attachment, AttachmentEvent, AttachmentKind, CurrentAttachment, Op};
pub use tk_refs::ReindexReport;
pub use tk_types::{abbreviate, parse_due, DateLocale, DurableId, ThreadRecord, ThreadStatus};
