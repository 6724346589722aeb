//! Row sources: where raw upstream rows come from.
//!
//! The fetch/scrape transport lives outside this workspace; a source hands
//! over rows that are already decoded into header → cell text. Files on disk
//! (CSV with a header row, or a JSON array of flat objects) and in-memory rows
//! are supported.

use serde_json::{Number, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use stocktrack_core::{Column, ColumnType, RawRow};

use crate::config::RowFormat;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV decode failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of objects, found {0}")]
    NotAnArray(&'static str),

    #[error("row {row}: field {header:?} is not a string, number, or null")]
    UnsupportedValue { row: usize, header: String },
}

/// Anything that can produce one batch of raw rows.
pub trait RowSource: Send + Sync {
    /// Human-readable description for logs and history.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<RawRow>, SourceError>;
}

/// CSV file with a header row.
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RowSource for CsvFileSource {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn load(&self) -> Result<Vec<RawRow>, SourceError> {
        let rows = read_csv_rows(open(&self.path)?)?;
        debug!(path = %self.path.display(), rows = rows.len(), "loaded CSV rows");
        Ok(rows)
    }
}

/// JSON file holding an array of flat objects.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RowSource for JsonFileSource {
    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    fn load(&self) -> Result<Vec<RawRow>, SourceError> {
        let value: Value = serde_json::from_reader(open(&self.path)?)?;
        let rows = json_rows(value)?;
        debug!(path = %self.path.display(), rows = rows.len(), "loaded JSON rows");
        Ok(rows)
    }
}

/// Rows already in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticRows {
    rows: Vec<RawRow>,
}

impl StaticRows {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

impl RowSource for StaticRows {
    fn describe(&self) -> String {
        format!("static:{} rows", self.rows.len())
    }

    fn load(&self) -> Result<Vec<RawRow>, SourceError> {
        Ok(self.rows.clone())
    }
}

/// File source for `path`, picking the decoder from `format`.
pub fn source_for_path(path: &Path, format: RowFormat) -> Box<dyn RowSource> {
    match format.resolve(path) {
        RowFormat::Json => Box::new(JsonFileSource::new(path)),
        _ => Box::new(CsvFileSource::new(path)),
    }
}

/// Decode CSV text (header row first) into raw rows.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: RawRow = headers.iter().zip(record.iter()).collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Convert a JSON array of flat objects into raw rows. Numbers are kept in
/// their JSON text form, with a `%` appended for percentage columns (a bare
/// `12.5` there means 12.5 percentage points); `null` becomes an empty
/// (absent) cell.
pub fn json_rows(value: Value) -> Result<Vec<RawRow>, SourceError> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(SourceError::NotAnArray(json_kind(&other))),
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let fields = match item {
            Value::Object(fields) => fields,
            other => return Err(SourceError::NotAnArray(json_kind(&other))),
        };
        let mut row = RawRow::new();
        for (header, value) in fields {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => number_text(&header, &n),
                Value::Null => String::new(),
                _ => {
                    return Err(SourceError::UnsupportedValue {
                        row: index,
                        header,
                    })
                }
            };
            row.insert(&header, text);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn number_text(header: &str, n: &Number) -> String {
    match Column::from_header(header).map(|column| column.column_type()) {
        Some(ColumnType::Percentage | ColumnType::PercentagePair) => format!("{n}%"),
        _ => n.to_string(),
    }
}

fn open(path: &Path) -> Result<BufReader<File>, SourceError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use serde_json::json;
    use stocktrack_core::aggregate;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-01-05 20:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn csv_rows_map_headers() {
        let text = "Ticker,Market Cap,EPS/Sales Surpr.,Beta\nAAPL, 3.9T ,6.24%3.88%,1.2\nMSFT,3.1T,-,0.9\n";
        let rows = read_csv_rows(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(Column::MarketCap), Some("3.9T"));
        assert_eq!(rows[0].get(Column::EpsSalesSurprise), Some("6.24%3.88%"));
        assert_eq!(rows[1].get(Column::EpsSalesSurprise), Some("-"));
        assert_eq!(rows[1].len(), 3);
    }

    #[test]
    fn csv_short_rows_are_tolerated() {
        let rows = read_csv_rows("Ticker,Market Cap,Earnings\nAAA,5B\n".as_bytes()).unwrap();
        assert_eq!(rows[0].get(Column::NextEarnings), None);
    }

    #[test]
    fn json_numbers_and_nulls() {
        let rows = json_rows(json!([
            {"ticker": "AAA", "market_cap": 5000000000u64, "avg_target_price": null},
            {"ticker": "BBB", "market_cap": "250B", "eps_yy_ttm": "12.5%"}
        ]))
        .unwrap();
        assert_eq!(rows[0].get(Column::MarketCap), Some("5000000000"));
        assert_eq!(rows[0].get(Column::AvgTargetPrice), Some(""));
        assert_eq!(rows[1].get(Column::EpsYoyTtm), Some("12.5%"));
    }

    #[test]
    fn json_numeric_percentages_keep_their_unit() {
        let rows = json_rows(json!([
            {"ticker": "AAA", "market_cap": 5000000000u64, "eps_yy_ttm": 12.5, "sales_q_rep": -3}
        ]))
        .unwrap();
        assert_eq!(rows[0].get(Column::EpsYoyTtm), Some("12.5%"));
        assert_eq!(rows[0].get(Column::SalesQoq), Some("-3%"));

        let (snapshot, report) = aggregate(&rows, ts()).unwrap();
        let f = &snapshot.equities()[0].fundamentals;
        assert_eq!(f.eps_yoy_ttm, Some(12.5));
        assert_eq!(f.sales_qoq, Some(-3.0));
        assert_eq!(report.field_failures_total(), 0);
    }

    #[test]
    fn scraper_shaped_records_load() {
        let rows = json_rows(json!([{
            "ticker": "AAPL",
            "market_cap": "3907.83B",
            "cap_category": "Mega Cap",
            "next_earnings": "Jan 29 AMC",
            "eps_yy_ttm": "25.58%",
            "sales_yy_ttm": "10.07%",
            "eps_q_rep": "18.54%",
            "sales_q_rep": "15.65%",
            "eps_surpr": "6.24%",
            "sales_surpr": "3.88%",
            "avg_target_price": "297.92"
        }]))
        .unwrap();
        assert_eq!(rows[0].get(Column::EpsQoq), Some("18.54%"));
        assert_eq!(rows[0].get(Column::QuarterlyEpsReported), None);

        let (snapshot, report) = aggregate(&rows, ts()).unwrap();
        let f = &snapshot.get("AAPL").unwrap().fundamentals;
        assert_eq!(f.eps_qoq, Some(18.54));
        assert_eq!(f.sales_qoq, Some(15.65));
        assert_eq!(f.eps_surprise, Some(6.24));
        assert_eq!(f.sales_surprise, Some(3.88));
        assert_eq!(f.avg_target_price, Some(297.92));
        assert_eq!(report.field_failures_total(), 0);
    }

    #[test]
    fn json_rejects_non_arrays_and_nested_values() {
        assert!(matches!(
            json_rows(json!({"ticker": "AAA"})),
            Err(SourceError::NotAnArray("an object"))
        ));
        assert!(matches!(
            json_rows(json!([{"ticker": ["AAA"]}])),
            Err(SourceError::UnsupportedValue { row: 0, .. })
        ));
    }

    #[test]
    fn static_rows_load_clones() {
        let source = StaticRows::new(vec![RawRow::new().with(Column::Ticker, "AAA")]);
        assert_eq!(source.load().unwrap().len(), 1);
        assert_eq!(source.load().unwrap().len(), 1);
        assert_eq!(source.describe(), "static:1 rows");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CsvFileSource::new("/nonexistent/rows.csv").load().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rows.csv"));
    }
}
