//! Error types for engine operations.

use revkv_store::StoreError;

/// Errors surfaced by engine operations.
///
/// A key without a current version is not an error: lookups return `None`
/// and undo/redo report `HistoryOutcome::NoCommands`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The store was unreachable or rejected a batch.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A singleton invariant did not hold; the operation was aborted.
    #[error("invariant violation: {0}")]
    InvariantViolation(Violation),

    #[error("store assigned no id to an inserted version")]
    UnassignedId,

    #[error("engine write lock poisoned by a panicked writer")]
    Poisoned,
}

/// Which singleton invariant was found broken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// More than one current version for one key.
    #[error("{count} current versions for key `{name}`")]
    MultipleCurrent { name: String, count: usize },

    /// More than one lastly-changed record in the store.
    #[error("{count} lastly-changed records")]
    MultipleLastlyChanged { count: usize },
}
