//! Version records: one snapshot of a key's value plus its chain links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identity of a version record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub u64);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a record is the live version of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Current,
    #[serde(rename = "none")]
    Inactive,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Inactive => "none",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted version of one key.
///
/// Records with the same `name` form a chain through `parent_id` (older)
/// and `child_id` (newer). After creation only `status`, `lastly_changed`
/// and `child_id` ever change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: VersionId,
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<VersionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<VersionId>,
    pub status: Status,
    #[serde(default)]
    pub lastly_changed: bool,
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn is_current(&self) -> bool {
        self.status == Status::Current
    }

    /// Retire this record: no longer current, no longer carrying the marker.
    pub fn retire(&mut self) {
        self.status = Status::Inactive;
        self.lastly_changed = false;
    }

    /// Make this record the live, lastly-changed version of its key.
    pub fn activate(&mut self) {
        self.status = Status::Current;
        self.lastly_changed = true;
    }
}

/// A record not yet persisted; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub name: String,
    pub value: Option<String>,
    pub parent_id: Option<VersionId>,
    pub child_id: Option<VersionId>,
    pub status: Status,
    pub lastly_changed: bool,
}

impl NewVersion {
    /// A fresh current version carrying the lastly-changed marker.
    pub fn head(
        name: impl Into<String>,
        value: Option<String>,
        parent_id: Option<VersionId>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            parent_id,
            child_id: None,
            status: Status::Current,
            lastly_changed: true,
        }
    }

    /// Placeholder for the unset state before a key's first write.
    pub fn stab(name: impl Into<String>, first: VersionId) -> Self {
        Self {
            name: name.into(),
            value: None,
            parent_id: None,
            child_id: Some(first),
            status: Status::Current,
            lastly_changed: true,
        }
    }

    pub fn into_record(self, id: VersionId, created_at: DateTime<Utc>) -> VersionRecord {
        VersionRecord {
            id,
            name: self.name,
            value: self.value,
            parent_id: self.parent_id,
            child_id: self.child_id,
            status: self.status,
            lastly_changed: self.lastly_changed,
            created_at,
        }
    }
}
