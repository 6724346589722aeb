//! Stocktrack Runner — refresh orchestration around `stocktrack-core`.
//!
//! This crate provides:
//! - TOML configuration with defaults for every field
//! - Row sources (CSV and JSON files, in-memory rows)
//! - Snapshot store with atomic swap and the refresh cycle
//! - Snapshot JSON persistence (schema-versioned, atomic writes) and view CSV export
//! - Plain-text table rendering
//! - JSONL run history

pub mod config;
pub mod display;
pub mod export;
pub mod history;
pub mod refresh;
pub mod source;

pub use config::{ConfigError, RowFormat, TrackerConfig, ViewConfig};
pub use display::{format_cell, render_table, DEFAULT_COLUMNS};
pub use export::{
    export_json, export_view_csv, import_json, load_snapshot, load_snapshot_if_present,
    save_snapshot, SnapshotDocument, SCHEMA_VERSION,
};
pub use history::{HistoryEntry, RunHistory};
pub use refresh::{refresh, RefreshError, RefreshOutcome, SnapshotStore};
pub use source::{source_for_path, CsvFileSource, JsonFileSource, RowSource, SourceError, StaticRows};
