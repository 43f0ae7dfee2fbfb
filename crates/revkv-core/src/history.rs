//! One-lane undo/redo over the marked key's version chain.
//!
//! There is no separate stack. The lastly-changed marker selects the active
//! key, `parent_id` is the undo direction and `child_id` the redo direction.
//! Every step keeps the marker on whichever version is current afterwards,
//! so repeated steps walk one key's chain until a fresh write moves the
//! marker elsewhere.

use crate::error::EngineError;
use crate::resolve::{resolve_current, resolve_lastly_changed};
use revkv_store::{NewVersion, VersionId, VersionRecord, VersionStore, WriteBatch};
use serde::Serialize;
use std::fmt;

/// Result of one undo or redo step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HistoryOutcome {
    /// Nothing to step to.
    NoCommands,
    /// The active key now resolves to `value` at version `current`.
    Moved {
        name: String,
        value: Option<String>,
        current: VersionId,
    },
}

impl HistoryOutcome {
    fn moved(record: VersionRecord) -> Self {
        Self::Moved {
            name: record.name,
            value: record.value,
            current: record.id,
        }
    }
}

impl fmt::Display for HistoryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCommands => f.write_str("no commands"),
            Self::Moved { name, value, .. } => {
                write!(f, "{name} = {}", value.as_deref().unwrap_or("None"))
            }
        }
    }
}

/// The marker record and the current version of its key.
fn active<S>(store: &S) -> Result<Option<(VersionRecord, VersionRecord)>, EngineError>
where
    S: VersionStore + ?Sized,
{
    let Some(marker) = resolve_lastly_changed(store)? else {
        return Ok(None);
    };
    let Some(current) = resolve_current(store, &marker.name)? else {
        return Ok(None);
    };
    Ok(Some((marker, current)))
}

/// Start a batch that drops the marker from `marker` when it sits on a
/// record other than the one being stepped from. Later updates of the same
/// record replace this one.
fn release_stray_marker(marker: VersionRecord, current: &VersionRecord) -> WriteBatch {
    let batch = WriteBatch::new();
    if marker.id == current.id {
        return batch;
    }
    tracing::warn!(marker = %marker.id, current = %current.id, "marker detached from current version");
    let mut marker = marker;
    marker.lastly_changed = false;
    batch.update(marker)
}

/// Step the active key one version back.
pub fn undo<S>(store: &S) -> Result<HistoryOutcome, EngineError>
where
    S: VersionStore + ?Sized,
{
    let Some((marker, mut current)) = active(store)? else {
        return Ok(HistoryOutcome::NoCommands);
    };
    let batch = release_stray_marker(marker, &current);

    match current.parent_id {
        None if current.value.is_none() => Ok(HistoryOutcome::NoCommands),
        None => {
            // First real write: insert a stab standing for "before any write".
            let name = current.name.clone();
            let stab = NewVersion::stab(name.clone(), current.id);
            current.retire();
            let stab_id = store
                .put_batch(batch.insert(stab).update(current))?
                .into_iter()
                .next()
                .ok_or(EngineError::UnassignedId)?;
            Ok(HistoryOutcome::Moved {
                name,
                value: None,
                current: stab_id,
            })
        }
        Some(parent_id) => {
            let Some(mut parent) = store.get(parent_id)? else {
                tracing::warn!(current = %current.id, parent = %parent_id, "parent version missing");
                return Ok(HistoryOutcome::NoCommands);
            };
            parent.activate();
            parent.child_id = Some(current.id);
            current.retire();
            store.put_batch(batch.update(current).update(parent.clone()))?;
            Ok(HistoryOutcome::moved(parent))
        }
    }
}

/// Step the active key one version forward.
pub fn redo<S>(store: &S) -> Result<HistoryOutcome, EngineError>
where
    S: VersionStore + ?Sized,
{
    let Some((marker, mut current)) = active(store)? else {
        return Ok(HistoryOutcome::NoCommands);
    };
    let Some(child_id) = current.child_id else {
        return Ok(HistoryOutcome::NoCommands);
    };
    let Some(mut child) = store.get(child_id)? else {
        tracing::warn!(current = %current.id, child = %child_id, "child version missing");
        return Ok(HistoryOutcome::NoCommands);
    };

    let name = current.name.clone();
    let batch = release_stray_marker(marker, &current);
    current.retire();
    child.activate();
    store.put_batch(batch.update(current).update(child.clone()))?;

    let now_current = resolve_current(store, &name)?.unwrap_or(child);
    Ok(HistoryOutcome::moved(now_current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::set;
    use revkv_store::{MemoryStore, Status};

    fn value(store: &MemoryStore, name: &str) -> Option<String> {
        resolve_current(store, name)
            .expect("resolve")
            .and_then(|record| record.value)
    }

    #[test]
    fn outcome_renders_like_assignment() {
        assert_eq!(HistoryOutcome::NoCommands.to_string(), "no commands");
        let moved = HistoryOutcome::Moved {
            name: "x".to_string(),
            value: Some("1".to_string()),
            current: VersionId(1),
        };
        assert_eq!(moved.to_string(), "x = 1");
        let unset = HistoryOutcome::Moved {
            name: "x".to_string(),
            value: None,
            current: VersionId(2),
        };
        assert_eq!(unset.to_string(), "x = None");
    }

    #[test]
    fn undo_repairs_forward_link() {
        let store = MemoryStore::new();
        let first = set(&store, "x", Some("1".to_string())).expect("set");
        let second = set(&store, "x", Some("2".to_string())).expect("set");

        let outcome = undo(&store).expect("undo");
        assert_eq!(outcome.to_string(), "x = 1");

        let parent = store.get(first).expect("get").expect("exists");
        assert_eq!(parent.child_id, Some(second));
        assert!(parent.lastly_changed);
        assert_eq!(parent.status, Status::Current);
    }

    #[test]
    fn undo_past_first_write_inserts_stab_once() {
        let store = MemoryStore::new();
        let first = set(&store, "x", Some("1".to_string())).expect("set");

        let outcome = undo(&store).expect("undo");
        let HistoryOutcome::Moved { current: stab, .. } = outcome else {
            panic!("expected a step, got {outcome:?}");
        };
        let stab = store.get(stab).expect("get").expect("exists");
        assert_eq!(stab.child_id, Some(first));
        assert_eq!(stab.value, None);
        assert_eq!(value(&store, "x"), None);

        assert_eq!(undo(&store).expect("undo"), HistoryOutcome::NoCommands);
    }

    #[test]
    fn redo_without_child_reports_no_commands() {
        let store = MemoryStore::new();
        set(&store, "x", Some("1".to_string())).expect("set");
        assert_eq!(redo(&store).expect("redo"), HistoryOutcome::NoCommands);
    }

    #[test]
    fn redo_returns_to_undone_version() {
        let store = MemoryStore::new();
        set(&store, "x", Some("1".to_string())).expect("set");
        let second = set(&store, "x", Some("2".to_string())).expect("set");
        undo(&store).expect("undo");

        let outcome = redo(&store).expect("redo");
        assert_eq!(
            outcome,
            HistoryOutcome::Moved {
                name: "x".to_string(),
                value: Some("2".to_string()),
                current: second,
            }
        );
        assert_eq!(value(&store, "x").as_deref(), Some("2"));
    }

    #[test]
    fn undo_follows_marker_not_latest_key() {
        let store = MemoryStore::new();
        set(&store, "a", Some("1".to_string())).expect("set");
        set(&store, "b", Some("1".to_string())).expect("set");
        set(&store, "b", Some("2".to_string())).expect("set");

        assert_eq!(undo(&store).expect("undo").to_string(), "b = 1");
        assert_eq!(undo(&store).expect("undo").to_string(), "b = None");
        assert_eq!(undo(&store).expect("undo"), HistoryOutcome::NoCommands);
        assert_eq!(value(&store, "a").as_deref(), Some("1"));
    }

    #[test]
    fn outcome_json_carries_outcome_tag() {
        assert_eq!(
            serde_json::to_value(HistoryOutcome::NoCommands).expect("serialize"),
            serde_json::json!({ "outcome": "no_commands" })
        );
        let moved = HistoryOutcome::Moved {
            name: "x".to_string(),
            value: None,
            current: VersionId(3),
        };
        assert_eq!(
            serde_json::to_value(&moved).expect("serialize"),
            serde_json::json!({ "outcome": "moved", "name": "x", "value": null, "current": 3 })
        );
    }
}
