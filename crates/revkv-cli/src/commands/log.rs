use crate::config::Config;
use crate::support::{open_engine, or_exit, print_json};
use revkv_store::{VersionId, VersionRecord};
use serde_json::json;
use std::path::PathBuf;

pub fn run(config: &Config, name: String, store: Option<PathBuf>, json_output: bool) {
    let (engine, path) = open_engine(store, config);
    let versions = or_exit(engine.versions(&name));

    if json_output {
        print_json(&json!({
            "name": name,
            "store": path.display().to_string(),
            "versions": versions,
        }));
        return;
    }

    println!("revkv log {name}");
    println!("  Source: {}", path.display());
    println!("  Versions: {}", versions.len());
    for record in &versions {
        println!("  {}", describe(record));
    }
}

fn describe(record: &VersionRecord) -> String {
    let mut flags = vec![record.status.as_str()];
    if record.lastly_changed {
        flags.push("lastly changed");
    }
    format!(
        "#{} {} [{}] parent={} child={} at {}",
        record.id,
        record.value.as_deref().unwrap_or("None"),
        flags.join(", "),
        link(record.parent_id),
        link(record.child_id),
        record.created_at.to_rfc3339(),
    )
}

fn link(id: Option<VersionId>) -> String {
    id.map_or_else(|| "-".to_string(), |id| format!("#{id}"))
}
