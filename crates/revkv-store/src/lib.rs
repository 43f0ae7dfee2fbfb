//! # revkv-store
//!
//! Storage layer for versioned key state.
//!
//! This crate provides:
//! - `VersionRecord` (one snapshot of a key plus its chain links)
//! - the `VersionStore` adapter contract (point get, filtered query,
//!   atomic batch write, delete)
//! - `MemoryStore` (in-process) and `JsonlStore` (one JSONL file guarded by
//!   a lock file)
//!
//! It does not know about undo/redo or the lastly-changed marker's meaning.
//! Those live in `revkv-core`.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per version)
//!     <-> load / save
//! VersionTable (id -> record, name -> chain of ids)
//! ```

pub mod adapter;
pub mod atomic_store;
pub mod jsonl;
pub mod memory;
pub mod record;

pub use adapter::{Filter, StoreError, VersionStore, WriteBatch, WriteScope, matches_all};
pub use atomic_store::{JsonlStore, StoreFileLock, store_lock_path};
pub use jsonl::{JsonlError, load_versions, parse_versions, render_versions, save_versions};
pub use memory::{MemoryStore, VersionTable};
pub use record::{NewVersion, Status, VersionId, VersionRecord};
