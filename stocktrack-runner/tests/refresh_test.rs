//! File-backed refresh cycle: rows on disk → store → persisted snapshot → history.

use chrono::NaiveDateTime;
use std::fs;

use stocktrack_core::{view, CapCategory, SortColumn, SortDirection, ViewState};
use stocktrack_runner::{
    load_snapshot, load_snapshot_if_present, refresh, save_snapshot, source_for_path,
    HistoryEntry, RefreshError, RowFormat, RunHistory, SnapshotStore,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn at(day: u32) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("2025-01-{day:02} 20:00:00"), "%Y-%m-%d %H:%M:%S")
        .unwrap()
}

const SCREENER_CSV: &str = "\
Ticker,Market Cap,Earnings,EPS Y/Y TTM,Sales Y/Y TTM,EPS/Sales Surpr.,EPS Q Estimate,EPS Q Reported,Target Price
AAA,5B,Feb 05 BMO,12.5%,8%,-,1.00,1.10,45.10
BBB,250B,Jan 29 AMC,-3.2%,4.1%,6.24%3.88%,-,-,310
CCC,1.5B,Jan 30,1%,1%,-,-,-,12
BBB,260B,-,-,-,-,-,-,-
";

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn csv_refresh_persist_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let rows_path = dir.path().join("screener.csv");
    fs::write(&rows_path, SCREENER_CSV).unwrap();

    let store = SnapshotStore::new();
    let source = source_for_path(&rows_path, RowFormat::Auto);
    let outcome = refresh(source.as_ref(), &store, at(5)).unwrap();

    assert_eq!(outcome.report.total_rows, 4);
    assert_eq!(outcome.report.admitted, 2);
    assert_eq!(outcome.report.duplicates.len(), 1);

    let snapshot = store.current().unwrap();
    let bbb = snapshot.get("BBB").unwrap();
    assert_eq!(bbb.cap_category(), CapCategory::MegaCap);
    assert_eq!(bbb.fundamentals.eps_surprise, Some(6.24));
    let aaa = snapshot.get("AAA").unwrap();
    assert!((aaa.fundamentals.eps_surprise.unwrap() - 10.0).abs() < 1e-9);

    let snapshot_path = dir.path().join("out/snapshot.json");
    save_snapshot(&snapshot, &snapshot_path).unwrap();
    assert!(!dir.path().join("out/snapshot.json.tmp").exists());
    let reloaded = load_snapshot(&snapshot_path).unwrap();
    assert_eq!(&reloaded, &*snapshot);

    let state = ViewState::new().sorted_by(SortColumn::NextEarnings, SortDirection::Ascending);
    let order: Vec<String> = view(&reloaded, &state)
        .iter()
        .map(|e| e.ticker.to_string())
        .collect();
    assert_eq!(order, vec!["BBB", "AAA"]);
}

#[test]
fn json_rows_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let rows_path = dir.path().join("rows.json");
    fs::write(
        &rows_path,
        r#"[{"ticker": "MSFT", "market_cap": "3.1T", "eps_up": 4, "eps_down": 1},
            {"ticker": "MID", "market_cap": 3500000000}]"#,
    )
    .unwrap();

    let store = SnapshotStore::new();
    let outcome = refresh(
        source_for_path(&rows_path, RowFormat::Auto).as_ref(),
        &store,
        at(5),
    )
    .unwrap();
    assert_eq!(outcome.snapshot.len(), 2);
    let msft = outcome.snapshot.get("MSFT").unwrap();
    assert_eq!(msft.fundamentals.eps_revisions.net(), Some(3));
    assert_eq!(
        outcome.snapshot.get("MID").unwrap().cap_category(),
        CapCategory::MidCap
    );
}

#[test]
fn failed_refresh_leaves_persisted_snapshot_alone() {
    let dir = tempfile::tempdir().unwrap();
    let rows_path = dir.path().join("screener.csv");
    let snapshot_path = dir.path().join("snapshot.json");
    fs::write(&rows_path, SCREENER_CSV).unwrap();

    let store = SnapshotStore::new();
    let good = refresh(source_for_path(&rows_path, RowFormat::Csv).as_ref(), &store, at(5)).unwrap();
    save_snapshot(&good.snapshot, &snapshot_path).unwrap();
    let saved = fs::read_to_string(&snapshot_path).unwrap();

    // Upstream changed its export format.
    fs::write(&rows_path, "Symbol,Cap\nAAA,5B\n").unwrap();
    let err = refresh(source_for_path(&rows_path, RowFormat::Csv).as_ref(), &store, at(6))
        .unwrap_err();
    assert!(matches!(err, RefreshError::Build(_)));

    assert_eq!(fs::read_to_string(&snapshot_path).unwrap(), saved);
    assert_eq!(store.current().unwrap().generated_at(), at(5));
}

#[test]
fn missing_snapshot_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_snapshot_if_present(&dir.path().join("nope.json"))
        .unwrap()
        .is_none());
}

#[test]
fn history_records_each_successful_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let rows_path = dir.path().join("screener.csv");
    fs::write(&rows_path, SCREENER_CSV).unwrap();
    let history = RunHistory::new(dir.path().join("history.jsonl"));

    let store = SnapshotStore::new();
    for day in [5, 6] {
        let outcome =
            refresh(source_for_path(&rows_path, RowFormat::Auto).as_ref(), &store, at(day)).unwrap();
        history.append(&HistoryEntry::from_outcome(&outcome)).unwrap();
    }

    let entries = history.read_all().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].changed);
    assert!(!entries[1].changed);
    assert_eq!(entries[0].fingerprint, entries[1].fingerprint);
    assert_eq!(entries[1].category_counts.mega_cap, 1);
    assert_eq!(entries[1].admitted, 2);
}
