//! JSONL-backed store with lock-scoped writes.
//!
//! Every call reads the file fresh, so the file stays the single source of
//! truth across processes. Writers serialize through `write_scope()`, which
//! holds an exclusive `<path>.lock` file for the whole read-modify-write.

use crate::adapter::{Filter, StoreError, VersionStore, WriteBatch, WriteScope};
use crate::memory::VersionTable;
use crate::record::{VersionId, VersionRecord};
use chrono::Utc;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn store_lock_path(store_path: &Path) -> PathBuf {
    let mut path: OsString = store_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Exclusive lock file; removed on drop.
#[derive(Debug)]
pub struct StoreFileLock {
    lock_path: PathBuf,
    _file: File,
}

impl StoreFileLock {
    /// Create the lock file next to `store_path`, failing fast when another
    /// writer already holds it.
    pub fn acquire(store_path: &Path) -> Result<Self, StoreError> {
        let lock_path = store_lock_path(store_path);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| lock_io(&lock_path, e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::LockBusy {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(err) => Err(lock_io(&lock_path, err.to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for StoreFileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_io(lock_path: &Path, message: impl Into<String>) -> StoreError {
    StoreError::LockIo {
        lock_path: lock_path.display().to_string(),
        message: message.into(),
    }
}

/// Version store persisted as one JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current table state; a missing file is an empty store.
    pub fn load(&self) -> Result<VersionTable, StoreError> {
        if !self.path.exists() {
            return Ok(VersionTable::new());
        }
        VersionTable::load_jsonl(&self.path)
    }

    fn mutate<T>(
        &self,
        mutator: impl FnOnce(&mut VersionTable) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let mut table = self.load()?;
        let (value, changed) = mutator(&mut table)?;
        if changed {
            table.save_jsonl(&self.path)?;
        }
        Ok(value)
    }
}

impl VersionStore for JsonlStore {
    fn get(&self, id: VersionId) -> Result<Option<VersionRecord>, StoreError> {
        Ok(self.load()?.get(id).cloned())
    }

    fn query(
        &self,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        Ok(self.load()?.query(filters, limit))
    }

    fn put_batch(&self, batch: WriteBatch) -> Result<Vec<VersionId>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.mutate(|table| Ok((table.apply(batch, Utc::now())?, true)))
    }

    fn delete(&self, id: VersionId) -> Result<bool, StoreError> {
        self.mutate(|table| {
            let removed = table.remove(id).is_some();
            Ok((removed, removed))
        })
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        self.mutate(|table| {
            let removed = table.clear();
            Ok((removed, removed > 0))
        })
    }

    fn write_scope(&self) -> Result<WriteScope, StoreError> {
        Ok(WriteScope::file_locked(StoreFileLock::acquire(&self.path)?))
    }
}
