//! Run history — one JSON object per line, appended after each successful build.
//!
//! Each line is independent, so a torn final write costs one entry at most;
//! malformed lines are skipped on read.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use stocktrack_core::domain::CategoryCounts;
use stocktrack_core::{BuildReport, DropReason};

use crate::refresh::RefreshOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub generated_at: NaiveDateTime,
    pub origin: String,
    pub fingerprint: String,
    pub changed: bool,
    pub total_rows: usize,
    pub admitted: usize,
    pub category_counts: CategoryCounts,
    #[serde(default)]
    pub dropped: BTreeMap<DropReason, usize>,
    #[serde(default)]
    pub field_failures: usize,
}

impl HistoryEntry {
    pub fn from_outcome(outcome: &RefreshOutcome) -> Self {
        let report: &BuildReport = &outcome.report;
        Self {
            generated_at: outcome.snapshot.generated_at(),
            origin: outcome.origin.clone(),
            fingerprint: outcome.fingerprint.clone(),
            changed: outcome.changed,
            total_rows: report.total_rows,
            admitted: report.admitted,
            category_counts: outcome.snapshot.category_counts(),
            dropped: report.dropped.clone(),
            field_failures: report.field_failures_total(),
        }
    }
}

/// JSONL history file.
pub struct RunHistory {
    path: PathBuf,
}

impl RunHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, entry: &HistoryEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()
    }

    /// All readable entries, oldest first.
    pub fn read_all(&self) -> io::Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = number + 1,
                    error = %e,
                    "skipping malformed history line"
                ),
            }
        }
        Ok(entries)
    }

    /// The most recent `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> io::Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
