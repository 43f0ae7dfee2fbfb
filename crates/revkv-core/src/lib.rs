//! # revkv-core
//!
//! Versioning and undo/redo engine for a key-value store.
//!
//! Every write appends an immutable version linked to its predecessor;
//! exactly one version per key is current, and one record store-wide
//! carries the lastly-changed marker that selects the key undo/redo walks.
//!
//! ## Architecture
//!
//! ```text
//! VersionStore          <- adapter: get / query / put_batch / delete
//!     |
//! resolve               <- current version of a key, marker record
//!     |
//! mutation  history     <- set/unset; undo/redo along parent/child links
//!     |        |
//! count     audit       <- cardinality; invariant checks
//!     |
//! Engine                <- serialized operation surface
//! ```

pub mod audit;
pub mod count;
pub mod engine;
pub mod error;
pub mod history;
pub mod mutation;
pub mod resolve;

pub use audit::{AuditFinding, AuditReport, audit};
pub use count::count_equal;
pub use engine::Engine;
pub use error::{EngineError, Violation};
pub use history::{HistoryOutcome, redo, undo};
pub use mutation::{set, unset};
pub use resolve::{resolve_current, resolve_lastly_changed};
