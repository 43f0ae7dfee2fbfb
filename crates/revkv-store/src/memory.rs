//! Canonical in-memory representation of version state.
//!
//! `VersionTable` is the explicit owned graph:
//! - id -> record
//! - name -> ordered list of ids (the key's chain, oldest first)
//!
//! `MemoryStore` wraps a table behind a lock and implements `VersionStore`.
//! `JsonlStore` loads and saves the same table.

use crate::adapter::{Filter, StoreError, VersionStore, WriteBatch, matches_all};
use crate::jsonl::{JsonlError, load_versions, save_versions};
use crate::record::{VersionId, VersionRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

/// Version records indexed by id and by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTable {
    records: BTreeMap<VersionId, VersionRecord>,
    chains: BTreeMap<String, Vec<VersionId>>,
    next_id: u64,
}

impl VersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from fully-materialized records.
    ///
    /// Duplicate ids are resolved with last-write-wins, matching append
    /// overlays of the JSONL file. An id leaving no successor is rejected.
    pub fn from_records(records: Vec<VersionRecord>) -> Result<Self, StoreError> {
        let mut table = Self::new();
        for record in records {
            table.upsert(record)?;
        }
        Ok(table)
    }

    /// Load table state from a JSONL file.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_records(load_versions(path.as_ref())?)
    }

    /// Persist table state to a JSONL file.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), JsonlError> {
        let records: Vec<VersionRecord> = self.records.values().cloned().collect();
        save_versions(path.as_ref(), &records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: VersionId) -> Option<&VersionRecord> {
        self.records.get(&id)
    }

    /// Iterate all records in id order.
    pub fn records(&self) -> impl Iterator<Item = &VersionRecord> {
        self.records.values()
    }

    /// Iterate the records of one key, oldest first.
    pub fn chain(&self, name: &str) -> impl Iterator<Item = &VersionRecord> {
        self.chains
            .get(name)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.records.get(id))
    }

    /// Records matching every filter, in id order.
    ///
    /// A `Name` filter narrows the scan to that key's chain.
    pub fn query(&self, filters: &[Filter], limit: Option<usize>) -> Vec<VersionRecord> {
        let name = filters.iter().find_map(|filter| match filter {
            Filter::Name(name) => Some(name.as_str()),
            _ => None,
        });
        let candidates: Box<dyn Iterator<Item = &VersionRecord> + '_> = match name {
            Some(name) => Box::new(self.chain(name)),
            None => Box::new(self.records()),
        };

        candidates
            .filter(|record| matches_all(filters, record))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Apply a batch all-or-nothing.
    ///
    /// Every update must name an existing record and keep its key, and the
    /// inserts must fit in the id space; the batch is validated before
    /// anything is touched.
    pub fn apply(
        &mut self,
        batch: WriteBatch,
        now: DateTime<Utc>,
    ) -> Result<Vec<VersionId>, StoreError> {
        for update in &batch.updates {
            match self.records.get(&update.id) {
                Some(existing) if existing.name == update.name => {}
                Some(_) => return Err(StoreError::RenamedVersion(update.id)),
                None => return Err(StoreError::UnknownVersion(update.id)),
            }
        }
        let first = self.next_id.max(1);
        let needed = u64::try_from(batch.inserts.len()).unwrap_or(u64::MAX);
        if first.checked_add(needed).is_none() {
            return Err(StoreError::IdSpaceExhausted(VersionId(first)));
        }

        for update in batch.updates {
            self.records.insert(update.id, update);
        }

        let mut assigned = Vec::with_capacity(batch.inserts.len());
        for version in batch.inserts {
            let id = self.allocate_id()?;
            self.upsert(version.into_record(id, now))?;
            assigned.push(id);
        }
        Ok(assigned)
    }

    /// Remove one record and its chain entry.
    pub fn remove(&mut self, id: VersionId) -> Option<VersionRecord> {
        let record = self.records.remove(&id)?;
        if let Some(ids) = self.chains.get_mut(&record.name) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.chains.remove(&record.name);
            }
        }
        Some(record)
    }

    /// Remove every record; ids keep increasing afterwards.
    pub fn clear(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        self.chains.clear();
        removed
    }

    fn allocate_id(&mut self) -> Result<VersionId, StoreError> {
        let id = VersionId(self.next_id.max(1));
        self.next_id = successor(id)?;
        Ok(id)
    }

    fn upsert(&mut self, record: VersionRecord) -> Result<(), StoreError> {
        let id = record.id;
        self.next_id = self.next_id.max(successor(id)?);
        if self
            .records
            .get(&id)
            .is_some_and(|previous| previous.name != record.name)
        {
            self.remove(id);
        }

        let ids = self.chains.entry(record.name.clone()).or_default();
        if let Err(pos) = ids.binary_search(&id) {
            ids.insert(pos, id);
        }
        self.records.insert(id, record);
        Ok(())
    }
}

fn successor(id: VersionId) -> Result<u64, StoreError> {
    id.0.checked_add(1).ok_or(StoreError::IdSpaceExhausted(id))
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<VersionTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: VersionTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    /// Clone of the current table state.
    pub fn snapshot(&self) -> Result<VersionTable, StoreError> {
        Ok(self.table.read().map_err(|_| StoreError::Poisoned)?.clone())
    }
}

impl VersionStore for MemoryStore {
    fn get(&self, id: VersionId) -> Result<Option<VersionRecord>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.get(id).cloned())
    }

    fn query(
        &self,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.query(filters, limit))
    }

    fn put_batch(&self, batch: WriteBatch) -> Result<Vec<VersionId>, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        table.apply(batch, Utc::now())
    }

    fn delete(&self, id: VersionId) -> Result<bool, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.remove(id).is_some())
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.clear())
    }
}
