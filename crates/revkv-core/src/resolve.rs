//! Current-value resolution.
//!
//! Both lookups are singleton queries: more than one match means a writer
//! bypassed serialization, and the calling operation is aborted instead of
//! picking one of the matches.

use crate::error::{EngineError, Violation};
use revkv_store::{Filter, Status, VersionRecord, VersionStore};

/// The current version of `name`, if the key has one.
pub fn resolve_current<S>(store: &S, name: &str) -> Result<Option<VersionRecord>, EngineError>
where
    S: VersionStore + ?Sized,
{
    let matches = store.query(
        &[Filter::Name(name.to_string()), Filter::Status(Status::Current)],
        None,
    )?;
    singleton(matches, |count| Violation::MultipleCurrent {
        name: name.to_string(),
        count,
    })
}

/// The record carrying the store-wide lastly-changed marker, if any.
pub fn resolve_lastly_changed<S>(store: &S) -> Result<Option<VersionRecord>, EngineError>
where
    S: VersionStore + ?Sized,
{
    let matches = store.query(&[Filter::LastlyChanged(true)], None)?;
    singleton(matches, |count| Violation::MultipleLastlyChanged { count })
}

fn singleton(
    mut matches: Vec<VersionRecord>,
    violation: impl FnOnce(usize) -> Violation,
) -> Result<Option<VersionRecord>, EngineError> {
    if matches.len() > 1 {
        let violation = violation(matches.len());
        tracing::error!(%violation, "aborting operation on broken singleton invariant");
        return Err(EngineError::InvariantViolation(violation));
    }
    Ok(matches.pop())
}
