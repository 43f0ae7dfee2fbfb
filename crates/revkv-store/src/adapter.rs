//! The store adapter contract consumed by the versioning engine.
//!
//! A store offers keyed point lookups, equality-filtered queries, atomic
//! multi-record writes and deletion. Nothing here assumes a concrete engine;
//! `MemoryStore` and `JsonlStore` are the two adapters shipped in this crate.

use crate::atomic_store::StoreFileLock;
use crate::jsonl::JsonlError;
use crate::record::{NewVersion, Status, VersionId, VersionRecord};

/// Errors raised by store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("version not found: {0}")]
    UnknownVersion(VersionId),

    #[error("version {0} cannot move to another key")]
    RenamedVersion(VersionId),

    #[error("version id space exhausted at {0}")]
    IdSpaceExhausted(VersionId),

    #[error("store lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error("failed to acquire store lock {lock_path}: {message}")]
    LockIo { lock_path: String, message: String },

    #[error("store state poisoned by a panicked writer")]
    Poisoned,
}

/// One equality filter over a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Name(String),
    Value(String),
    Status(Status),
    LastlyChanged(bool),
}

impl Filter {
    pub fn matches(&self, record: &VersionRecord) -> bool {
        match self {
            Self::Name(name) => record.name == *name,
            Self::Value(value) => record.value.as_deref() == Some(value.as_str()),
            Self::Status(status) => record.status == *status,
            Self::LastlyChanged(flag) => record.lastly_changed == *flag,
        }
    }
}

/// Records matching every filter (an empty filter list matches all).
pub fn matches_all(filters: &[Filter], record: &VersionRecord) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}

/// An all-or-nothing group of inserts and updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub inserts: Vec<NewVersion>,
    pub updates: Vec<VersionRecord>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, version: NewVersion) -> Self {
        self.inserts.push(version);
        self
    }

    /// Queue an update, replacing an earlier update of the same record.
    pub fn update(mut self, record: VersionRecord) -> Self {
        match self.updates.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => *slot = record,
            None => self.updates.push(record),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

/// Serialization guard held across one read-modify-write.
///
/// Dropping the scope releases whatever the store acquired.
#[derive(Debug, Default)]
pub struct WriteScope {
    lock: Option<StoreFileLock>,
}

impl WriteScope {
    /// A scope that holds nothing; enough for stores whose only writers
    /// share one process and one engine.
    pub fn unscoped() -> Self {
        Self::default()
    }

    pub(crate) fn file_locked(lock: StoreFileLock) -> Self {
        Self { lock: Some(lock) }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

/// Storage backend for version records.
pub trait VersionStore: Send + Sync {
    /// Point lookup by id.
    fn get(&self, id: VersionId) -> Result<Option<VersionRecord>, StoreError>;

    /// Records matching every filter, in ascending id order.
    fn query(
        &self,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<VersionRecord>, StoreError>;

    /// Apply a batch atomically. Returns the ids assigned to `batch.inserts`
    /// in order. An update naming an unknown id rejects the whole batch.
    fn put_batch(&self, batch: WriteBatch) -> Result<Vec<VersionId>, StoreError>;

    /// Remove one record. Returns `false` when it did not exist.
    fn delete(&self, id: VersionId) -> Result<bool, StoreError>;

    /// Remove every record, returning how many were removed.
    fn delete_all(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for record in self.query(&[], None)? {
            if self.delete(record.id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Acquire the store's serialization scope for one mutation.
    fn write_scope(&self) -> Result<WriteScope, StoreError> {
        Ok(WriteScope::unscoped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: u64, name: &str, value: Option<&str>, status: Status) -> VersionRecord {
        VersionRecord {
            id: VersionId(id),
            name: name.to_string(),
            value: value.map(str::to_string),
            parent_id: None,
            child_id: None,
            status,
            lastly_changed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn value_filter_never_matches_absent_value() {
        let unset = record(1, "x", None, Status::Current);
        let empty = record(2, "x", Some(""), Status::Current);

        assert!(!Filter::Value(String::new()).matches(&unset));
        assert!(Filter::Value(String::new()).matches(&empty));
    }

    #[test]
    fn filters_are_conjunctive() {
        let filters = [
            Filter::Name("x".to_string()),
            Filter::Status(Status::Current),
        ];
        assert!(matches_all(&filters, &record(1, "x", Some("1"), Status::Current)));
        assert!(!matches_all(&filters, &record(2, "x", Some("1"), Status::Inactive)));
        assert!(!matches_all(&filters, &record(3, "y", Some("1"), Status::Current)));
        assert!(matches_all(&[], &record(4, "z", None, Status::Inactive)));
    }

    #[test]
    fn batch_update_replaces_same_record() {
        let mut first = record(1, "x", Some("1"), Status::Current);
        let batch = WriteBatch::new().update(first.clone());
        first.retire();
        let batch = batch.update(first);

        assert_eq!(batch.updates.len(), 1);
        assert_eq!(batch.updates[0].status, Status::Inactive);
    }
}
