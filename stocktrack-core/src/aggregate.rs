//! Record aggregator: raw rows → snapshot.
//!
//! Rows are parsed in parallel (order preserved), then admitted and
//! deduplicated sequentially so that "first occurrence wins" is deterministic.

use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::columns::Column;
use crate::derive::{derive_category, derive_revisions};
use crate::domain::{
    EarningsDate, Equity, EstimateReport, Fundamentals, Snapshot, SnapshotError, Ticker,
};
use crate::parse::{self, Field, TypedValue};
use crate::row::RawRow;

/// Why a row was left out of the snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingTicker,
    InvalidTicker,
    MissingMarketCap,
    MalformedMarketCap,
    BelowThreshold,
    DuplicateTicker,
}

/// Counts from one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub total_rows: usize,
    pub admitted: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    /// Tickers discarded as later duplicates, in source order.
    pub duplicates: Vec<Ticker>,
    /// Malformed (not absent) optional fields, per column.
    pub field_failures: BTreeMap<Column, usize>,
}

impl BuildReport {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    pub fn field_failures_total(&self) -> usize {
        self.field_failures.values().sum()
    }

    fn drop_row(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no rows received from upstream")]
    EmptyInput,

    #[error("required column {0} missing from every row; upstream format may have changed")]
    MissingColumn(Column),

    #[error("none of {} rows qualified for the snapshot", .0.total_rows)]
    NoEquities(Box<BuildReport>),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Build a snapshot and report how each row was handled.
///
/// `generated_at` is stamped on the snapshot, and its date anchors year
/// inference for earnings dates given without a year.
pub fn aggregate(
    rows: &[RawRow],
    generated_at: NaiveDateTime,
) -> Result<(Snapshot, BuildReport), AggregateError> {
    if rows.is_empty() {
        return Err(AggregateError::EmptyInput);
    }
    for column in Column::REQUIRED {
        if !rows.iter().any(|row| row.has(column)) {
            return Err(AggregateError::MissingColumn(column));
        }
    }

    let reference = generated_at.date();
    let parsed: Vec<ParsedRow> = rows
        .par_iter()
        .map(|row| parse_row(row, reference))
        .collect();

    let mut report = BuildReport {
        total_rows: rows.len(),
        ..BuildReport::default()
    };
    let mut seen: HashSet<Ticker> = HashSet::with_capacity(parsed.len());
    let mut equities = Vec::with_capacity(parsed.len());

    for (index, row) in parsed.into_iter().enumerate() {
        for column in row.failures {
            *report.field_failures.entry(column).or_insert(0) += 1;
        }
        match row.outcome {
            Ok(equity) if seen.contains(&equity.ticker) => {
                debug!(row = index, ticker = %equity.ticker, "dropping duplicate ticker");
                report.drop_row(DropReason::DuplicateTicker);
                report.duplicates.push(equity.ticker);
            }
            Ok(equity) => {
                seen.insert(equity.ticker.clone());
                equities.push(equity);
            }
            Err(reason) => {
                debug!(row = index, ?reason, "dropping row");
                report.drop_row(reason);
            }
        }
    }

    report.admitted = equities.len();
    if equities.is_empty() {
        return Err(AggregateError::NoEquities(Box::new(report)));
    }

    let snapshot = Snapshot::new(generated_at, equities)?;
    info!(
        rows = report.total_rows,
        admitted = report.admitted,
        dropped = report.dropped_total(),
        field_failures = report.field_failures_total(),
        "built snapshot"
    );
    Ok((snapshot, report))
}

/// [`aggregate`] without the report.
pub fn build_snapshot(
    rows: &[RawRow],
    generated_at: NaiveDateTime,
) -> Result<Snapshot, AggregateError> {
    aggregate(rows, generated_at).map(|(snapshot, _)| snapshot)
}

// ── Row parsing ──────────────────────────────────────────────────────

struct ParsedRow {
    outcome: Result<Equity, DropReason>,
    failures: Vec<Column>,
}

/// Typed access to one row's cells, collecting malformed optional fields.
struct RowReader<'a> {
    row: &'a RawRow,
    reference: NaiveDate,
    failures: Vec<Column>,
}

impl<'a> RowReader<'a> {
    fn field(&self, column: Column) -> Field<TypedValue> {
        match self.row.get(column) {
            Some(raw) => Field::from_result(parse::parse(raw, column.column_type(), self.reference)),
            None => Field::Absent,
        }
    }

    /// Optional field: malformed is counted and degraded to absent.
    fn optional(&mut self, column: Column) -> Option<TypedValue> {
        let field = self.field(column);
        if field.is_malformed() {
            self.failures.push(column);
        }
        field.present()
    }

    fn number(&mut self, column: Column) -> Option<f64> {
        self.optional(column).and_then(TypedValue::into_number)
    }

    fn count(&mut self, column: Column) -> Option<u32> {
        self.optional(column).and_then(TypedValue::into_count)
    }

    fn date(&mut self, column: Column) -> Option<EarningsDate> {
        self.optional(column).and_then(TypedValue::into_date)
    }

    fn pair(&mut self, column: Column) -> (Option<f64>, Option<f64>) {
        self.optional(column)
            .and_then(TypedValue::into_pair)
            .unwrap_or((None, None))
    }

    fn estimate_report(&mut self, estimate: Column, reported: Column) -> EstimateReport {
        EstimateReport::new(self.number(estimate), self.number(reported))
    }
}

fn parse_row(row: &RawRow, reference: NaiveDate) -> ParsedRow {
    let mut reader = RowReader {
        row,
        reference,
        failures: Vec::new(),
    };
    let outcome = admit(&mut reader);
    ParsedRow {
        outcome,
        failures: reader.failures,
    }
}

fn admit(reader: &mut RowReader<'_>) -> Result<Equity, DropReason> {
    let ticker = match reader.field(Column::Ticker) {
        Field::Present(value) => value.into_text().ok_or(DropReason::MissingTicker)?,
        Field::Absent | Field::Malformed(_) => return Err(DropReason::MissingTicker),
    };
    let ticker = Ticker::parse(&ticker).map_err(|_| DropReason::InvalidTicker)?;

    let market_cap = match reader.field(Column::MarketCap) {
        Field::Present(value) => value.into_number().ok_or(DropReason::MalformedMarketCap)?,
        Field::Absent => return Err(DropReason::MissingMarketCap),
        Field::Malformed(_) => return Err(DropReason::MalformedMarketCap),
    };
    if market_cap < 0.0 {
        return Err(DropReason::MalformedMarketCap);
    }
    derive_category(market_cap).map_err(|_| DropReason::BelowThreshold)?;

    let fundamentals = read_fundamentals(reader);
    Equity::new(ticker, market_cap, fundamentals).map_err(|_| DropReason::BelowThreshold)
}

fn read_fundamentals(reader: &mut RowReader<'_>) -> Fundamentals {
    let quarterly_eps =
        reader.estimate_report(Column::QuarterlyEpsEstimate, Column::QuarterlyEpsReported);
    let quarterly_revenue = reader.estimate_report(
        Column::QuarterlyRevenueEstimate,
        Column::QuarterlyRevenueReported,
    );
    let annual_revenue =
        reader.estimate_report(Column::AnnualRevenueEstimate, Column::AnnualRevenueReported);
    // Derived surprise first, then the already-split fields, then the combined one.
    let eps_reported_surprise = reader.number(Column::EpsSurprise);
    let sales_reported_surprise = reader.number(Column::SalesSurprise);
    let (eps_combined, sales_combined) = reader.pair(Column::EpsSalesSurprise);

    let eps_revisions = derive_revisions(
        reader.count(Column::EpsRevisionsUp),
        reader.count(Column::EpsRevisionsDown),
    );
    let sales_revisions = derive_revisions(
        reader.count(Column::SalesRevisionsUp),
        reader.count(Column::SalesRevisionsDown),
    );

    Fundamentals {
        next_earnings: reader.date(Column::NextEarnings),
        eps_yoy_ttm: reader.number(Column::EpsYoyTtm),
        sales_yoy_ttm: reader.number(Column::SalesYoyTtm),
        eps_qoq: reader.number(Column::EpsQoq),
        sales_qoq: reader.number(Column::SalesQoq),
        eps_surprise: quarterly_eps
            .surprise()
            .or(eps_reported_surprise)
            .or(eps_combined),
        sales_surprise: quarterly_revenue
            .surprise()
            .or(sales_reported_surprise)
            .or(sales_combined),
        quarterly_eps,
        quarterly_revenue,
        annual_revenue,
        eps_revisions,
        sales_revisions,
        avg_target_price: reader
            .number(Column::AvgTargetPrice)
            .filter(|price| *price >= 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapCategory, RevisionSignal};

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-01-05 20:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn row(ticker: &str, cap: &str) -> RawRow {
        RawRow::new()
            .with(Column::Ticker, ticker)
            .with(Column::MarketCap, cap)
    }

    #[test]
    fn empty_input_is_fatal() {
        assert!(matches!(aggregate(&[], ts()), Err(AggregateError::EmptyInput)));
    }

    #[test]
    fn missing_market_cap_column_is_fatal() {
        let rows = vec![RawRow::new().with(Column::Ticker, "AAA")];
        assert!(matches!(
            aggregate(&rows, ts()),
            Err(AggregateError::MissingColumn(Column::MarketCap))
        ));
    }

    #[test]
    fn zero_admitted_rows_is_fatal_and_carries_report() {
        let rows = vec![row("AAA", "1B"), row("BBB", "garbage")];
        match aggregate(&rows, ts()) {
            Err(AggregateError::NoEquities(report)) => {
                assert_eq!(report.total_rows, 2);
                assert_eq!(report.dropped_for(DropReason::BelowThreshold), 1);
                assert_eq!(report.dropped_for(DropReason::MalformedMarketCap), 1);
            }
            other => panic!("expected NoEquities, got {other:?}"),
        }
    }

    #[test]
    fn row_level_drops_are_counted() {
        let rows = vec![
            row("AAA", "5B"),
            row("-", "5B"),
            row("B@D", "5B"),
            RawRow::new().with(Column::Ticker, "NOCAP"),
            row("NEG", "-3B"),
            row("TINY", "500M"),
        ];
        let (snapshot, report) = aggregate(&rows, ts()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(report.admitted, 1);
        assert_eq!(report.dropped_for(DropReason::MissingTicker), 1);
        assert_eq!(report.dropped_for(DropReason::InvalidTicker), 1);
        assert_eq!(report.dropped_for(DropReason::MissingMarketCap), 1);
        assert_eq!(report.dropped_for(DropReason::MalformedMarketCap), 1);
        assert_eq!(report.dropped_for(DropReason::BelowThreshold), 1);
        assert_eq!(report.admitted + report.dropped_total(), report.total_rows);
    }

    #[test]
    fn duplicates_keep_first_row() {
        let rows = vec![
            row("AAA", "5B").with(Column::AvgTargetPrice, "100"),
            row("BBB", "30B"),
            row("aaa", "7B").with(Column::AvgTargetPrice, "200"),
        ];
        let (snapshot, report) = aggregate(&rows, ts()).unwrap();
        let tickers: Vec<&str> = snapshot.equities().iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "BBB"]);
        let aaa = snapshot.get("AAA").unwrap();
        assert_eq!(aaa.market_cap(), 5e9);
        assert_eq!(aaa.fundamentals.avg_target_price, Some(100.0));
        assert_eq!(report.duplicates, vec![Ticker::parse("AAA").unwrap()]);
    }

    #[test]
    fn dropped_row_does_not_claim_its_ticker() {
        let rows = vec![row("AAA", "1B"), row("AAA", "5B")];
        let (snapshot, report) = aggregate(&rows, ts()).unwrap();
        assert_eq!(snapshot.get("AAA").unwrap().market_cap(), 5e9);
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn malformed_optional_fields_degrade_to_absent() {
        let rows = vec![row("AAA", "5B")
            .with(Column::EpsYoyTtm, "12")
            .with(Column::NextEarnings, "Smarch 40")
            .with(Column::SalesYoyTtm, "-")
            .with(Column::EpsQoq, "4.5%")];
        let (snapshot, report) = aggregate(&rows, ts()).unwrap();
        let f = &snapshot.equities()[0].fundamentals;
        assert_eq!(f.eps_yoy_ttm, None);
        assert_eq!(f.next_earnings, None);
        assert_eq!(f.sales_yoy_ttm, None);
        assert_eq!(f.eps_qoq, Some(4.5));
        assert_eq!(report.field_failures.get(&Column::EpsYoyTtm), Some(&1));
        assert_eq!(report.field_failures.get(&Column::NextEarnings), Some(&1));
        assert_eq!(report.field_failures.get(&Column::SalesYoyTtm), None);
    }

    #[test]
    fn surprise_derived_from_estimates() {
        let rows = vec![row("AAA", "5B")
            .with(Column::QuarterlyEpsEstimate, "1.00")
            .with(Column::QuarterlyEpsReported, "1.10")
            .with(Column::EpsSalesSurprise, "99%1.5%")];
        let (snapshot, _) = aggregate(&rows, ts()).unwrap();
        let f = &snapshot.equities()[0].fundamentals;
        assert!((f.eps_surprise.unwrap() - 10.0).abs() < 1e-9);
        // No revenue pair, so the combined field fills in.
        assert_eq!(f.sales_surprise, Some(1.5));
    }

    #[test]
    fn split_surprise_fields_precede_combined() {
        let rows = vec![row("AAA", "5B")
            .with(Column::EpsSurprise, "6.24%")
            .with(Column::SalesSurprise, "-")
            .with(Column::EpsSalesSurprise, "1%2%")];
        let (snapshot, report) = aggregate(&rows, ts()).unwrap();
        let f = &snapshot.equities()[0].fundamentals;
        assert_eq!(f.eps_surprise, Some(6.24));
        assert_eq!(f.sales_surprise, Some(2.0));
        assert_eq!(report.field_failures_total(), 0);
    }

    #[test]
    fn revisions_and_dates() {
        let rows = vec![row("AAA", "250B")
            .with(Column::EpsRevisionsUp, "3")
            .with(Column::EpsRevisionsDown, "1")
            .with(Column::NextEarnings, "Jan 29 AMC")];
        let (snapshot, _) = aggregate(&rows, ts()).unwrap();
        let e = &snapshot.equities()[0];
        assert_eq!(e.cap_category(), CapCategory::MegaCap);
        assert_eq!(e.fundamentals.eps_revisions, RevisionSignal::Counts { up: 3, down: 1 });
        assert_eq!(e.fundamentals.sales_revisions, RevisionSignal::Absent);
        let earnings = e.fundamentals.next_earnings.unwrap();
        assert_eq!(earnings.date, NaiveDate::from_ymd_opt(2025, 1, 29).unwrap());
    }

    #[test]
    fn preserves_source_order() {
        let rows: Vec<RawRow> = (0..200)
            .map(|i| row(&format!("T{i:03}"), "5B"))
            .collect();
        let (snapshot, _) = aggregate(&rows, ts()).unwrap();
        for (i, equity) in snapshot.equities().iter().enumerate() {
            assert_eq!(equity.ticker.as_str(), format!("T{i:03}"));
        }
    }
}
