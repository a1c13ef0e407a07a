//! Timestamped JSON exports

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// `{prefix}_{YYYYmmdd_HHMMSS}.json`
pub fn export_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.json", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// Write `value` as pretty JSON into a new timestamped file under `dir`
///
/// The directory is created if missing. Files are write-once: an existing
/// file with the same name is an error, never overwritten.
pub fn write_snapshot<T: Serialize>(dir: &Path, prefix: &str, value: &T) -> Result<PathBuf> {
    write_snapshot_at(dir, prefix, value, Utc::now())
}

pub fn write_snapshot_at<T: Serialize>(
    dir: &Path,
    prefix: &str,
    value: &T,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let path = dir.join(export_file_name(prefix, at));
    let json = serde_json::to_string_pretty(value).context("Failed to serialize export")?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .with_context(|| format!("Failed to write export file {}", path.display()))?;

    info!(path = %path.display(), "Export written");
    Ok(path)
}
