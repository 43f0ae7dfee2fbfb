//! Versioned writes.
//!
//! A write never edits a value in place: it appends a new current version,
//! retires the previous one, and moves the lastly-changed marker onto the
//! new version, all in one batch.

use crate::error::EngineError;
use crate::resolve::{resolve_current, resolve_lastly_changed};
use revkv_store::{NewVersion, VersionId, VersionStore, WriteBatch};

/// Append a new current version of `name` holding `value`.
///
/// `value = None` records an explicit unset. Returns the new version's id.
pub fn set<S>(store: &S, name: &str, value: Option<String>) -> Result<VersionId, EngineError>
where
    S: VersionStore + ?Sized,
{
    let parent = resolve_current(store, name)?;
    let marker = resolve_lastly_changed(store)?;

    let parent_id = parent.as_ref().map(|p| p.id);
    let mut batch = WriteBatch::new().insert(NewVersion::head(name, value, parent_id));

    if let Some(mut marker) = marker
        && Some(marker.id) != parent_id
    {
        marker.lastly_changed = false;
        batch = batch.update(marker);
    }
    if let Some(mut parent) = parent {
        parent.retire();
        batch = batch.update(parent);
    }

    store
        .put_batch(batch)?
        .into_iter()
        .next()
        .ok_or(EngineError::UnassignedId)
}

/// Record an explicit unset of `name` if it has a current version.
///
/// Returns `None` (and writes nothing) for a key that was never set.
pub fn unset<S>(store: &S, name: &str) -> Result<Option<VersionId>, EngineError>
where
    S: VersionStore + ?Sized,
{
    if resolve_current(store, name)?.is_none() {
        return Ok(None);
    }
    set(store, name, None).map(Some)
}
