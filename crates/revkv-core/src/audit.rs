//! Store-wide invariant audit.
//!
//! Checks the singleton invariants (one current version per key, one
//! lastly-changed record overall) and the integrity of chain links.

use crate::error::EngineError;
use revkv_store::{VersionId, VersionRecord, VersionStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditFinding {
    MultipleCurrent { name: String, ids: Vec<VersionId> },
    MultipleLastlyChanged { ids: Vec<VersionId> },
    /// The marker sits on a version that is not current.
    StaleMarker { id: VersionId },
    DanglingLink { id: VersionId, target: VersionId },
    CrossKeyLink { id: VersionId, target: VersionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub record_count: usize,
    pub key_count: usize,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

pub fn audit<S>(store: &S) -> Result<AuditReport, EngineError>
where
    S: VersionStore + ?Sized,
{
    let records = store.query(&[], None)?;
    let by_id: BTreeMap<VersionId, &VersionRecord> = records.iter().map(|r| (r.id, r)).collect();

    let mut current: BTreeMap<&str, Vec<VersionId>> = BTreeMap::new();
    let mut keys: BTreeSet<&str> = BTreeSet::new();
    let mut markers = Vec::new();
    let mut findings = Vec::new();

    for record in &records {
        keys.insert(&record.name);
        if record.is_current() {
            current.entry(&record.name).or_default().push(record.id);
        }
        if record.lastly_changed {
            markers.push(record.id);
            if !record.is_current() {
                findings.push(AuditFinding::StaleMarker { id: record.id });
            }
        }
        for target in [record.parent_id, record.child_id].into_iter().flatten() {
            match by_id.get(&target) {
                None => findings.push(AuditFinding::DanglingLink {
                    id: record.id,
                    target,
                }),
                Some(linked) if linked.name != record.name => {
                    findings.push(AuditFinding::CrossKeyLink {
                        id: record.id,
                        target,
                    })
                }
                Some(_) => {}
            }
        }
    }

    for (name, ids) in current {
        if ids.len() > 1 {
            findings.push(AuditFinding::MultipleCurrent {
                name: name.to_string(),
                ids,
            });
        }
    }
    if markers.len() > 1 {
        findings.push(AuditFinding::MultipleLastlyChanged { ids: markers });
    }

    Ok(AuditReport {
        record_count: records.len(),
        key_count: keys.len(),
        findings,
    })
}
