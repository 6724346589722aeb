//! Stocktrack CLI — build snapshots from screener rows and print sorted views.
//!
//! Commands:
//! - `build` — load raw rows, build a snapshot, persist it, append run history
//! - `view` — print (or export as CSV) a filtered, sorted view of the snapshot
//! - `history` — list recent builds
//! - `config` — print the effective configuration, or write a default file

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stocktrack_core::{view, CategoryFilter, SortColumn, SortDirection};
use stocktrack_runner::export::write_atomic;
use stocktrack_runner::{
    export_view_csv, load_snapshot, load_snapshot_if_present, refresh, render_table,
    save_snapshot, source_for_path, HistoryEntry, RowFormat, RunHistory, SnapshotStore,
    TrackerConfig, DEFAULT_COLUMNS,
};

#[derive(Parser)]
#[command(
    name = "stocktrack",
    about = "Stocktrack CLI — screened equities with derived earnings metrics"
)]
struct Cli {
    /// Path to a TOML config file. Missing file means defaults.
    #[arg(long, global = true, default_value = "stocktrack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from a row file and persist it.
    Build {
        /// Row file (CSV with header row, or JSON array). Overrides [input].path.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Row file format: auto, csv, json.
        #[arg(long, value_parser = parse_format)]
        format: Option<RowFormat>,

        /// Snapshot output path. Overrides [output].snapshot.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Generation timestamp (YYYY-MM-DD HH:MM:SS). Defaults to now.
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<NaiveDateTime>,

        /// Skip the run-history append.
        #[arg(long, default_value_t = false)]
        no_history: bool,
    },
    /// Print a filtered, sorted view of the current snapshot.
    View {
        /// Snapshot path. Overrides [output].snapshot.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Sort column (e.g. market_cap, "EPS Y/Y TTM", nextEarnings).
        #[arg(long)]
        sort: Option<SortColumn>,

        /// Sort direction: asc or desc.
        #[arg(long)]
        direction: Option<SortDirection>,

        /// Category filter: all, mid, large, mega.
        #[arg(long)]
        category: Option<CategoryFilter>,

        /// Case-insensitive ticker substring.
        #[arg(long)]
        search: Option<String>,

        /// Maximum rows to print.
        #[arg(long)]
        limit: Option<usize>,

        /// Comma-separated columns to show.
        #[arg(long, value_delimiter = ',')]
        columns: Vec<SortColumn>,

        /// Write the view as CSV to this path instead of printing.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List recent builds from the run history.
    History {
        /// Number of entries to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Write the default configuration to this path instead.
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = TrackerConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    match cli.command {
        Commands::Build {
            input,
            format,
            snapshot,
            at,
            no_history,
        } => run_build(config, input, format, snapshot, at, no_history),
        Commands::View {
            snapshot,
            sort,
            direction,
            category,
            search,
            limit,
            columns,
            csv,
        } => {
            let mut view_config = config.view.clone();
            if let Some(sort) = sort {
                view_config.sort_column = sort;
            }
            if let Some(direction) = direction {
                view_config.sort_direction = direction;
            }
            if let Some(category) = category {
                view_config.category_filter = category;
            }
            if let Some(search) = search {
                view_config.search_text = search;
            }
            if limit.is_some() {
                view_config.limit = limit;
            }
            let snapshot_path = snapshot.unwrap_or(config.output.snapshot);
            run_view(&snapshot_path, &view_config, &columns, csv.as_deref())
        }
        Commands::History { limit } => run_history(&config, limit),
        Commands::Config { init } => run_config(&config, init.as_deref()),
    }
}

/// Logs go to stderr so that printed views stay clean on stdout.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "stocktrack=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_format(s: &str) -> Result<RowFormat, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(RowFormat::Auto),
        "csv" => Ok(RowFormat::Csv),
        "json" => Ok(RowFormat::Json),
        _ => Err(format!("unknown format {s:?} (expected auto, csv, json)")),
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

fn run_build(
    config: TrackerConfig,
    input: Option<PathBuf>,
    format: Option<RowFormat>,
    snapshot: Option<PathBuf>,
    at: Option<NaiveDateTime>,
    no_history: bool,
) -> Result<()> {
    let Some(input) = input.or(config.input.path) else {
        bail!("no input file: pass --input or set [input].path in the config");
    };
    let format = format.unwrap_or(config.input.format);
    let snapshot_path = snapshot.unwrap_or(config.output.snapshot);
    let generated_at = at.unwrap_or_else(|| chrono::Local::now().naive_local());

    // Seed with the persisted snapshot so "changed" compares against it.
    let store = match load_snapshot_if_present(&snapshot_path) {
        Ok(Some(previous)) => SnapshotStore::with_snapshot(previous),
        Ok(None) => SnapshotStore::new(),
        Err(e) => {
            warn!(path = %snapshot_path.display(), error = %e, "ignoring unreadable snapshot");
            SnapshotStore::new()
        }
    };

    let source = source_for_path(&input, format);
    let outcome = refresh(source.as_ref(), &store, generated_at)
        .with_context(|| format!("build from {} failed; snapshot left unchanged", input.display()))?;

    save_snapshot(&outcome.snapshot, &snapshot_path)?;
    info!(path = %snapshot_path.display(), "snapshot saved");

    if config.history.enabled && !no_history {
        RunHistory::new(&config.history.path)
            .append(&HistoryEntry::from_outcome(&outcome))
            .with_context(|| format!("failed to append {}", config.history.path.display()))?;
    }

    let counts = outcome.snapshot.category_counts();
    println!(
        "Built snapshot: {} equities ({} mega, {} large, {} mid) from {} rows",
        outcome.snapshot.len(),
        counts.mega_cap,
        counts.large_cap,
        counts.mid_cap,
        outcome.report.total_rows,
    );
    for (reason, count) in &outcome.report.dropped {
        println!("  dropped {count} ({reason:?})");
    }
    if !outcome.report.field_failures.is_empty() {
        println!(
            "  {} malformed fields degraded to absent",
            outcome.report.field_failures_total()
        );
    }
    if !outcome.changed {
        println!("  data unchanged since last build");
    }
    println!("  fingerprint {}", outcome.fingerprint);
    Ok(())
}

fn run_view(
    snapshot_path: &Path,
    view_config: &stocktrack_runner::ViewConfig,
    columns: &[SortColumn],
    csv: Option<&Path>,
) -> Result<()> {
    let snapshot = load_snapshot(snapshot_path)?;
    let state = view_config.state();
    let mut rows = view(&snapshot, &state);
    if let Some(limit) = view_config.limit {
        rows.truncate(limit);
    }
    let columns = if columns.is_empty() {
        &DEFAULT_COLUMNS[..]
    } else {
        columns
    };

    if let Some(path) = csv {
        let text = export_view_csv(&rows, columns)?;
        write_atomic(path, text.as_bytes())?;
        println!("Wrote {} rows to {}", rows.len(), path.display());
        return Ok(());
    }

    println!(
        "Snapshot {} | sort {} {} | {} | search {:?}",
        snapshot.generated_at().format("%Y-%m-%d %H:%M"),
        state.sort_column,
        state.sort_direction,
        state.category_filter,
        state.search_text,
    );
    print!("{}", render_table(&rows, columns));
    Ok(())
}

fn run_history(config: &TrackerConfig, limit: usize) -> Result<()> {
    let history = RunHistory::new(&config.history.path);
    let entries = history
        .tail(limit)
        .with_context(|| format!("failed to read {}", history.path().display()))?;
    if entries.is_empty() {
        println!("No history at {}", history.path().display());
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {:>5} equities  {:>5} rows  {}  {}{}",
            entry.generated_at.format("%Y-%m-%d %H:%M:%S"),
            entry.admitted,
            entry.total_rows,
            short_fingerprint(&entry.fingerprint),
            entry.origin,
            if entry.changed { "" } else { "  (unchanged)" },
        );
    }
    Ok(())
}

/// First 12 characters of a fingerprint read back from history.
fn short_fingerprint(fingerprint: &str) -> String {
    fingerprint.chars().take(12).collect()
}

fn run_config(config: &TrackerConfig, init: Option<&Path>) -> Result<()> {
    match init {
        Some(path) => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            let text = TrackerConfig::default().to_toml()?;
            write_atomic(path, text.as_bytes())?;
            println!("Wrote default config to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
