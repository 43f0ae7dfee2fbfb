//! JSONL persistence: one version record per line.
//!
//! A file is decoded once as UTF-8 text and then parsed line by line; blank
//! lines and `#` comments are skipped. Saves replace the whole file through
//! a synced temp file, so a reader sees either the previous batch or the
//! new one.

use crate::record::{VersionId, VersionRecord};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from JSONL persistence.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("{path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("failed to encode version {id}: {source}")]
    Serialize {
        id: VersionId,
        source: serde_json::Error,
    },

    #[error("{path}: corrupt store file: {reason}")]
    Corrupt { path: String, reason: String },
}

impl JsonlError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn corrupt(path: &Path, reason: String) -> Self {
        Self::Corrupt {
            path: path.display().to_string(),
            reason,
        }
    }
}

/// Parse JSONL text into records, in file order.
pub fn parse_versions(text: &str) -> Result<Vec<VersionRecord>, JsonlError> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|source| JsonlError::Parse {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Encode records as JSONL text, one line each.
pub fn render_versions(records: &[VersionRecord]) -> Result<String, JsonlError> {
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| JsonlError::Serialize {
            id: record.id,
            source,
        })?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Read a store file. Invalid UTF-8 and NUL bytes mark it corrupt.
pub fn load_versions(path: &Path) -> Result<Vec<VersionRecord>, JsonlError> {
    let bytes = fs::read(path).map_err(|e| JsonlError::io(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        JsonlError::corrupt(
            path,
            format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
        )
    })?;
    if let Some(offset) = text.find('\0') {
        return Err(JsonlError::corrupt(path, format!("NUL byte at byte {offset}")));
    }
    parse_versions(&text)
}

/// Replace a store file with `records`.
pub fn save_versions(path: &Path, records: &[VersionRecord]) -> Result<(), JsonlError> {
    let text = render_versions(records)?;
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(|e| JsonlError::io(dir, e))?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = write_synced(&tmp, text.as_bytes()) {
        let _ = fs::remove_file(&tmp);
        return Err(JsonlError::io(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(JsonlError::io(path, e));
    }

    if let Some(dir) = dir {
        File::open(dir)
            .and_then(|handle| handle.sync_all())
            .map_err(|e| JsonlError::io(dir, e))?;
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn tmp_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{unique}", std::process::id()));
    PathBuf::from(tmp)
}
