//! The operation surface over one version store.

use crate::audit::{AuditReport, audit};
use crate::count::count_equal;
use crate::error::EngineError;
use crate::history::{HistoryOutcome, redo, undo};
use crate::mutation::{set, unset};
use crate::resolve::resolve_current;
use revkv_store::{Filter, VersionId, VersionRecord, VersionStore};
use std::sync::Mutex;
use tracing::debug;

/// Versioned key-value engine.
///
/// Every mutation moves the single lastly-changed marker, so mutations are
/// serialized as a whole: the engine's write lock covers writers in this
/// process and the store's write scope covers writers in other processes.
/// Reads take neither; they only ever observe whole batches.
#[derive(Debug)]
pub struct Engine<S> {
    store: S,
    writes: Mutex<()>,
}

impl<S: VersionStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            writes: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn write<T>(
        &self,
        op: impl FnOnce(&S) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let _guard = self.writes.lock().map_err(|_| EngineError::Poisoned)?;
        let _scope = self.store.write_scope()?;
        op(&self.store)
    }

    /// Write `value` as the new current version of `name`.
    pub fn set(&self, name: &str, value: impl Into<String>) -> Result<VersionId, EngineError> {
        let value = value.into();
        let id = self.write(|store| set(store, name, Some(value)))?;
        debug!(name, version = %id, "set");
        Ok(id)
    }

    /// The current value of `name`; `None` if never set or unset.
    pub fn get(&self, name: &str) -> Result<Option<String>, EngineError> {
        Ok(resolve_current(&self.store, name)?.and_then(|record| record.value))
    }

    /// Record an explicit unset; a no-op for keys without a current version.
    pub fn unset(&self, name: &str) -> Result<Option<VersionId>, EngineError> {
        let id = self.write(|store| unset(store, name))?;
        match id {
            Some(id) => debug!(name, version = %id, "unset"),
            None => debug!(name, "unset skipped: no current version"),
        }
        Ok(id)
    }

    /// Number of keys whose current value equals `value`.
    pub fn count_equal(&self, value: &str) -> Result<usize, EngineError> {
        count_equal(&self.store, value)
    }

    pub fn undo(&self) -> Result<HistoryOutcome, EngineError> {
        let outcome = self.write(|store| undo(store))?;
        debug!(%outcome, "undo");
        Ok(outcome)
    }

    pub fn redo(&self) -> Result<HistoryOutcome, EngineError> {
        let outcome = self.write(|store| redo(store))?;
        debug!(%outcome, "redo");
        Ok(outcome)
    }

    /// Delete every version of every key.
    pub fn clear_all(&self) -> Result<usize, EngineError> {
        let removed = self.write(|store| Ok(store.delete_all()?))?;
        debug!(removed, "cleared store");
        Ok(removed)
    }

    /// Every version of `name`, oldest first.
    pub fn versions(&self, name: &str) -> Result<Vec<VersionRecord>, EngineError> {
        Ok(self.store.query(&[Filter::Name(name.to_string())], None)?)
    }

    pub fn audit(&self) -> Result<AuditReport, EngineError> {
        audit(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Violation;
    use revkv_store::{MemoryStore, NewVersion, StoreError, WriteBatch, WriteScope};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn versions_lists_chain_oldest_first() {
        let engine = Engine::new(MemoryStore::new());
        let first = engine.set("x", "1").expect("set");
        engine.set("y", "1").expect("set");
        let second = engine.set("x", "2").expect("set");

        let ids: Vec<VersionId> = engine
            .versions("x")
            .expect("versions")
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
        assert!(engine.versions("missing").expect("versions").is_empty());
    }

    #[test]
    fn clear_all_resets_history() {
        let engine = Engine::new(MemoryStore::new());
        engine.set("x", "1").expect("set");
        engine.set("x", "2").expect("set");

        assert_eq!(engine.clear_all().expect("clear"), 2);
        assert_eq!(engine.get("x").expect("get"), None);
        assert_eq!(engine.undo().expect("undo"), HistoryOutcome::NoCommands);
    }

    /// Store whose write scope can be made to fail.
    struct BusyStore {
        inner: MemoryStore,
        busy: AtomicBool,
    }

    impl VersionStore for BusyStore {
        fn get(&self, id: VersionId) -> Result<Option<VersionRecord>, StoreError> {
            self.inner.get(id)
        }

        fn query(
            &self,
            filters: &[Filter],
            limit: Option<usize>,
        ) -> Result<Vec<VersionRecord>, StoreError> {
            self.inner.query(filters, limit)
        }

        fn put_batch(&self, batch: WriteBatch) -> Result<Vec<VersionId>, StoreError> {
            self.inner.put_batch(batch)
        }

        fn delete(&self, id: VersionId) -> Result<bool, StoreError> {
            self.inner.delete(id)
        }

        fn write_scope(&self) -> Result<WriteScope, StoreError> {
            if self.busy.load(Ordering::SeqCst) {
                return Err(StoreError::LockBusy {
                    lock_path: "busy.lock".to_string(),
                });
            }
            Ok(WriteScope::unscoped())
        }
    }

    #[test]
    fn busy_scope_fails_without_writing() {
        let engine = Engine::new(BusyStore {
            inner: MemoryStore::new(),
            busy: AtomicBool::new(false),
        });
        engine.set("x", "1").expect("set");
        engine.store().busy.store(true, Ordering::SeqCst);

        let err = engine.set("x", "2").expect_err("busy scope must fail");
        assert!(matches!(
            err,
            EngineError::Store(StoreError::LockBusy { .. })
        ));
        assert_eq!(engine.get("x").expect("reads need no scope").as_deref(), Some("1"));
    }

    #[test]
    fn default_delete_all_removes_one_by_one() {
        let engine = Engine::new(BusyStore {
            inner: MemoryStore::new(),
            busy: AtomicBool::new(false),
        });
        engine.set("x", "1").expect("set");
        engine.set("y", "1").expect("set");

        assert_eq!(engine.clear_all().expect("clear"), 2);
        assert_eq!(engine.audit().expect("audit").record_count, 0);
    }

    /// Engine over a store seeded directly, bypassing the write path.
    fn seeded_engine(versions: Vec<NewVersion>) -> Engine<MemoryStore> {
        let store = MemoryStore::new();
        let batch = versions.into_iter().fold(WriteBatch::new(), WriteBatch::insert);
        store.put_batch(batch).expect("seed batch should apply");
        Engine::new(store)
    }

    fn assert_writes_abort(engine: &Engine<MemoryStore>, expected: fn(&Violation) -> bool) {
        let before = engine.store().snapshot().expect("snapshot");
        let results = [
            engine.set("x", "9").map(|_| ()),
            engine.unset("x").map(|_| ()),
            engine.undo().map(|_| ()),
            engine.redo().map(|_| ()),
        ];
        for result in results {
            match result {
                Err(EngineError::InvariantViolation(violation)) => {
                    assert!(expected(&violation), "unexpected violation: {violation}");
                }
                other => panic!("expected an invariant violation, got {other:?}"),
            }
        }
        assert_eq!(engine.store().snapshot().expect("snapshot"), before);
    }

    #[test]
    fn two_current_versions_abort_every_write() {
        let engine = seeded_engine(vec![
            NewVersion::head("x", Some("1".to_string()), None),
            NewVersion {
                lastly_changed: false,
                ..NewVersion::head("x", Some("2".to_string()), None)
            },
        ]);
        assert_writes_abort(&engine, |violation| {
            matches!(violation, Violation::MultipleCurrent { name, count: 2 } if name == "x")
        });
    }

    #[test]
    fn two_markers_abort_every_write() {
        let engine = seeded_engine(vec![
            NewVersion::head("x", Some("1".to_string()), None),
            NewVersion::head("y", Some("1".to_string()), None),
        ]);
        assert_writes_abort(&engine, |violation| {
            matches!(violation, Violation::MultipleLastlyChanged { count: 2 })
        });
    }
}
