//! Snapshot persistence and view export.
//!
//! - **JSON**: the full snapshot wrapped with a `schema_version`; unknown newer
//!   versions are rejected on load. Categories are re-derived on load.
//! - **CSV**: the rows of one view, formatted as displayed.
//!
//! File writes are atomic: write to `.tmp`, then rename into place.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use stocktrack_core::domain::CategoryCounts;
use stocktrack_core::{Equity, Snapshot, SortColumn};

use crate::display::format_cell;

/// Version of the persisted snapshot document.
pub const SCHEMA_VERSION: u32 = 1;

/// Persisted form of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub schema_version: u32,
    pub fingerprint: String,
    pub category_counts: CategoryCounts,
    pub snapshot: Snapshot,
}

impl SnapshotDocument {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            fingerprint: snapshot.fingerprint(),
            category_counts: snapshot.category_counts(),
            snapshot,
        }
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

/// Serialize a snapshot to pretty JSON.
pub fn export_json(snapshot: &Snapshot) -> Result<String> {
    let document = SnapshotDocument::new(snapshot.clone());
    serde_json::to_string_pretty(&document).context("failed to serialize snapshot to JSON")
}

/// Deserialize a snapshot document, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<Snapshot> {
    let document: SnapshotDocument =
        serde_json::from_str(json).context("failed to deserialize snapshot from JSON")?;
    if document.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            document.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(document.snapshot)
}

/// Write the snapshot document to `path` atomically.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let json = export_json(snapshot)?;
    write_atomic(path, json.as_bytes())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json).with_context(|| format!("invalid snapshot file {}", path.display()))
}

/// Load the snapshot at `path`, or `None` if there is no file yet.
pub fn load_snapshot_if_present(path: &Path) -> Result<Option<Snapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    load_snapshot(path).map(Some)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Export view rows as CSV, one column per entry in `columns`.
pub fn export_view_csv(rows: &[&Equity], columns: &[SortColumn]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(columns.iter().map(|c| c.label()))?;
    for equity in rows {
        wtr.write_record(columns.iter().map(|c| format_cell(equity, *c)))?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `contents` to `path` via a temp file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, contents)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        anyhow::Error::new(e).context(format!("atomic rename to {} failed", path.display()))
    })
}
