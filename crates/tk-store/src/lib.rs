//! On-disk storage for Threadkeeper.
//!
//! Every thread owns one directory under the thread-collection root, located
//! purely by its durable ID:
//!
//! ```text
//! <root>/<bucket>/<durable-id>/thread.json
//! <root>/<bucket>/<durable-id>/attachments.jsonl
//! <root>/<bucket>/<durable-id>/blobs/<algo>/<h0:2>/<h2:4>/<hash>
//! ```
//!
//! There is no index: [`shard_path`] is the only way to find a thread, so
//! its bucketing rule is frozen.
//!
//! # Modules
//!
//! - [`shard`] — the directory sharding scheme
//! - [`blob`] — content-addressed note bodies ([`store_blob`], [`blob_path`])
//! - [`traits`] — the [`ThreadStore`] record persistence boundary
//! - [`file`] — [`FileThreadStore`], the on-disk backend
//! - [`memory`] — [`InMemoryThreadStore`] for tests and embedding

pub mod atomic;
pub mod blob;
pub mod error;
pub mod file;
pub mod memory;
pub mod shard;
pub mod traits;

pub use blob::{blob_path, locate_blob, read_blob, store_blob, BlobAlgo, BlobRef, StoredBlob};
pub use error::{StoreError, StoreResult};
pub use file::FileThreadStore;
pub use memory::InMemoryThreadStore;
pub use shard::{shard_path, thread_file, THREAD_FILE};
pub use traits::{sort_records, ThreadStore};
