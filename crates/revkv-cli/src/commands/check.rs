use crate::config::Config;
use crate::support::{open_engine, or_exit, print_json};
use revkv_core::AuditFinding;
use revkv_store::VersionId;
use serde_json::json;
use std::path::PathBuf;
use std::process;

/// Audit the store; exits 1 when any finding is reported.
pub fn run(config: &Config, store: Option<PathBuf>, json_output: bool) {
    let (engine, path) = open_engine(store, config);
    let report = or_exit(engine.audit());

    if json_output {
        print_json(&json!({
            "store": path.display().to_string(),
            "clean": report.is_clean(),
            "record_count": report.record_count,
            "key_count": report.key_count,
            "findings": report.findings,
        }));
    } else {
        println!("revkv check");
        println!("  Source: {}", path.display());
        println!("  Records: {}", report.record_count);
        println!("  Keys: {}", report.key_count);
        println!("  Findings: {}", report.findings.len());
        for finding in &report.findings {
            println!("    - {}", describe(finding));
        }
    }

    if !report.is_clean() {
        process::exit(1);
    }
}

fn describe(finding: &AuditFinding) -> String {
    match finding {
        AuditFinding::MultipleCurrent { name, ids } => {
            format!("{name}: multiple current versions ({})", id_list(ids))
        }
        AuditFinding::MultipleLastlyChanged { ids } => {
            format!("multiple lastly-changed versions ({})", id_list(ids))
        }
        AuditFinding::StaleMarker { id } => format!("#{id}: marker on a non-current version"),
        AuditFinding::DanglingLink { id, target } => {
            format!("#{id}: link to missing version #{target}")
        }
        AuditFinding::CrossKeyLink { id, target } => {
            format!("#{id}: link to #{target} crosses keys")
        }
    }
}

fn id_list(ids: &[VersionId]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
