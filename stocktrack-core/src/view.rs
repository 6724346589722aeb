//! Sort/filter engine.
//!
//! [`view`] is a pure function of a snapshot and a [`ViewState`]: filter by
//! category and ticker substring, then sort with a total order. Rows whose
//! sort-column value is absent always go last, whichever way the sort runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::domain::{CapCategory, Equity, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        })
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(format!("unknown sort direction: {s:?} (expected asc or desc)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    MidCap,
    LargeCap,
    MegaCap,
}

impl CategoryFilter {
    pub fn matches(&self, category: CapCategory) -> bool {
        match self {
            Self::All => true,
            Self::MidCap => category == CapCategory::MidCap,
            Self::LargeCap => category == CapCategory::LargeCap,
            Self::MegaCap => category == CapCategory::MegaCap,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::MidCap => CapCategory::MidCap.label(),
            Self::LargeCap => CapCategory::LargeCap.label(),
            Self::MegaCap => CapCategory::MegaCap.label(),
        }
    }
}

impl From<CapCategory> for CategoryFilter {
    fn from(category: CapCategory) -> Self {
        match category {
            CapCategory::MidCap => Self::MidCap,
            CapCategory::LargeCap => Self::LargeCap,
            CapCategory::MegaCap => Self::MegaCap,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<CapCategory>().map(Self::from)
    }
}

/// Sortable dashboard columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Ticker,
    Category,
    MarketCap,
    NextEarnings,
    EpsYoyTtm,
    SalesYoyTtm,
    EpsQoq,
    SalesQoq,
    EpsSurprise,
    SalesSurprise,
    QuarterlyEpsEstimate,
    QuarterlyEpsReported,
    QuarterlyRevenueEstimate,
    QuarterlyRevenueReported,
    AnnualRevenueEstimate,
    AnnualRevenueReported,
    EpsRevisions,
    SalesRevisions,
    /// Net of EPS and sales revisions combined.
    Revisions,
    AvgTargetPrice,
}

impl SortColumn {
    pub const ALL: [SortColumn; 20] = [
        Self::Ticker,
        Self::Category,
        Self::MarketCap,
        Self::NextEarnings,
        Self::EpsYoyTtm,
        Self::SalesYoyTtm,
        Self::EpsQoq,
        Self::SalesQoq,
        Self::EpsSurprise,
        Self::SalesSurprise,
        Self::QuarterlyEpsEstimate,
        Self::QuarterlyEpsReported,
        Self::QuarterlyRevenueEstimate,
        Self::QuarterlyRevenueReported,
        Self::AnnualRevenueEstimate,
        Self::AnnualRevenueReported,
        Self::EpsRevisions,
        Self::SalesRevisions,
        Self::Revisions,
        Self::AvgTargetPrice,
    ];

    /// Column header as displayed.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ticker => "Ticker",
            Self::Category => "Category",
            Self::MarketCap => "Market Cap",
            Self::NextEarnings => "Next Earnings",
            Self::EpsYoyTtm => "EPS Y/Y TTM",
            Self::SalesYoyTtm => "Sales Y/Y TTM",
            Self::EpsQoq => "EPS Q/Q",
            Self::SalesQoq => "Sales Q/Q",
            Self::EpsSurprise => "EPS Surprise",
            Self::SalesSurprise => "Sales Surprise",
            Self::QuarterlyEpsEstimate => "EPS Q Estimate",
            Self::QuarterlyEpsReported => "EPS Q Reported",
            Self::QuarterlyRevenueEstimate => "Rev Q Est",
            Self::QuarterlyRevenueReported => "Rev Q Rep",
            Self::AnnualRevenueEstimate => "Rev Ann Est",
            Self::AnnualRevenueReported => "Rev Ann Rep",
            Self::EpsRevisions => "EPS Revisions",
            Self::SalesRevisions => "Sales Revisions",
            Self::Revisions => "Revisions",
            Self::AvgTargetPrice => "Target Price",
        }
    }

    /// snake_case identifier, matching the serde form.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Category => "category",
            Self::MarketCap => "market_cap",
            Self::NextEarnings => "next_earnings",
            Self::EpsYoyTtm => "eps_yoy_ttm",
            Self::SalesYoyTtm => "sales_yoy_ttm",
            Self::EpsQoq => "eps_qoq",
            Self::SalesQoq => "sales_qoq",
            Self::EpsSurprise => "eps_surprise",
            Self::SalesSurprise => "sales_surprise",
            Self::QuarterlyEpsEstimate => "quarterly_eps_estimate",
            Self::QuarterlyEpsReported => "quarterly_eps_reported",
            Self::QuarterlyRevenueEstimate => "quarterly_revenue_estimate",
            Self::QuarterlyRevenueReported => "quarterly_revenue_reported",
            Self::AnnualRevenueEstimate => "annual_revenue_estimate",
            Self::AnnualRevenueReported => "annual_revenue_reported",
            Self::EpsRevisions => "eps_revisions",
            Self::SalesRevisions => "sales_revisions",
            Self::Revisions => "revisions",
            Self::AvgTargetPrice => "avg_target_price",
        }
    }

    /// Sort key of an equity under this column; `None` when the value is absent.
    pub fn key(&self, equity: &Equity) -> Option<SortKey> {
        let f = &equity.fundamentals;
        let number = |v: Option<f64>| v.map(SortKey::Number);
        match self {
            Self::Ticker => Some(SortKey::Text(equity.ticker.as_str().to_ascii_lowercase())),
            Self::Category => Some(SortKey::Text(
                equity.cap_category().label().to_ascii_lowercase(),
            )),
            Self::MarketCap => Some(SortKey::Number(equity.market_cap())),
            Self::NextEarnings => f.next_earnings.map(|d| SortKey::Date(d.sort_key())),
            Self::EpsYoyTtm => number(f.eps_yoy_ttm),
            Self::SalesYoyTtm => number(f.sales_yoy_ttm),
            Self::EpsQoq => number(f.eps_qoq),
            Self::SalesQoq => number(f.sales_qoq),
            Self::EpsSurprise => number(f.eps_surprise),
            Self::SalesSurprise => number(f.sales_surprise),
            Self::QuarterlyEpsEstimate => number(f.quarterly_eps.estimate),
            Self::QuarterlyEpsReported => number(f.quarterly_eps.reported),
            Self::QuarterlyRevenueEstimate => number(f.quarterly_revenue.estimate),
            Self::QuarterlyRevenueReported => number(f.quarterly_revenue.reported),
            Self::AnnualRevenueEstimate => number(f.annual_revenue.estimate),
            Self::AnnualRevenueReported => number(f.annual_revenue.reported),
            Self::EpsRevisions => number(f.eps_revisions.net().map(|n| n as f64)),
            Self::SalesRevisions => number(f.sales_revisions.net().map(|n| n as f64)),
            Self::Revisions => number(equity.revisions_up_down().net().map(|n| n as f64)),
            Self::AvgTargetPrice => number(f.avg_target_price),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortColumn {
    type Err = String;

    /// Accepts labels and identifiers in any case or separator style:
    /// `Market Cap`, `market_cap`, `market-cap`, `marketCap`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = squash(s);
        Self::ALL
            .into_iter()
            .find(|column| squash(column.label()) == key || squash(column.identifier()) == key)
            .ok_or_else(|| format!("unknown sort column: {s:?}"))
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Comparable value of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Number(f64),
    Date((NaiveDate, u8)),
    Text(String),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            // A column yields one key kind; rank kinds so the order stays total.
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Date(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

/// Ephemeral dashboard state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
    pub category_filter: CategoryFilter,
    pub search_text: String,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted_by(mut self, column: SortColumn, direction: SortDirection) -> Self {
        self.sort_column = column;
        self.sort_direction = direction;
        self
    }

    pub fn filtered(mut self, filter: CategoryFilter) -> Self {
        self.category_filter = filter;
        self
    }

    pub fn searching(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    /// Header click: the active column flips direction, another column
    /// becomes active in ascending order.
    pub fn click_column(&mut self, column: SortColumn) {
        if self.sort_column == column {
            self.sort_direction = self.sort_direction.reversed();
        } else {
            self.sort_column = column;
            self.sort_direction = SortDirection::Ascending;
        }
    }

    /// Category filter AND ticker search (trimmed, case-insensitive).
    pub fn matches(&self, equity: &Equity) -> bool {
        self.category_filter.matches(equity.cap_category())
            && equity.ticker.contains_ignore_case(self.search_text.trim())
    }

    /// Total order over equities for this state.
    pub fn compare(&self, a: &Equity, b: &Equity) -> Ordering {
        let by_value = match (self.sort_column.key(a), self.sort_column.key(b)) {
            (Some(ka), Some(kb)) => self.sort_direction.apply(ka.compare(&kb)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_value.then_with(|| a.ticker.cmp(&b.ticker))
    }
}

/// Filtered, ordered rows of `snapshot` under `state`.
pub fn view<'a>(snapshot: &'a Snapshot, state: &ViewState) -> Vec<&'a Equity> {
    let mut rows: Vec<&Equity> = snapshot
        .equities()
        .iter()
        .filter(|equity| state.matches(equity))
        .collect();
    rows.sort_by(|a, b| state.compare(a, b));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EarningsDate, Fundamentals, MarketSession, RevisionSignal, Ticker};
    use chrono::NaiveDateTime;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-01-05 20:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn equity(ticker: &str, cap: f64, f: Fundamentals) -> Equity {
        Equity::new(Ticker::parse(ticker).unwrap(), cap, f).unwrap()
    }

    fn with_yoy(yoy: Option<f64>) -> Fundamentals {
        Fundamentals {
            eps_yoy_ttm: yoy,
            ..Fundamentals::default()
        }
    }

    fn tickers(rows: &[&Equity]) -> Vec<String> {
        rows.iter().map(|e| e.ticker.to_string()).collect()
    }

    fn sample() -> Snapshot {
        Snapshot::new(
            ts(),
            vec![
                equity("MSFT", 3.1e12, with_yoy(Some(12.0))),
                equity("AAA", 5e9, with_yoy(None)),
                equity("ZZZ", 30e9, with_yoy(Some(-4.0))),
                equity("BBB", 250e9, with_yoy(Some(40.0))),
                equity("CCC", 2e9, with_yoy(None)),
            ],
        )
        .unwrap()
    }

    // ── ViewState ──

    #[test]
    fn default_state_is_ticker_ascending_all() {
        let s = ViewState::default();
        assert_eq!(s.sort_column, SortColumn::Ticker);
        assert_eq!(s.sort_direction, SortDirection::Ascending);
        assert_eq!(s.category_filter, CategoryFilter::All);
        assert!(s.search_text.is_empty());
    }

    #[test]
    fn click_flips_same_column_and_resets_new_column() {
        let mut s = ViewState::default();
        s.click_column(SortColumn::Ticker);
        assert_eq!(s.sort_direction, SortDirection::Descending);
        s.click_column(SortColumn::MarketCap);
        assert_eq!(s.sort_column, SortColumn::MarketCap);
        assert_eq!(s.sort_direction, SortDirection::Ascending);
        s.click_column(SortColumn::MarketCap);
        assert_eq!(s.sort_direction, SortDirection::Descending);
    }

    #[test]
    fn parses_column_names() {
        assert_eq!("marketCap".parse::<SortColumn>().unwrap(), SortColumn::MarketCap);
        assert_eq!("market_cap".parse::<SortColumn>().unwrap(), SortColumn::MarketCap);
        assert_eq!("market-cap".parse::<SortColumn>().unwrap(), SortColumn::MarketCap);
        assert_eq!("EPS Y/Y TTM".parse::<SortColumn>().unwrap(), SortColumn::EpsYoyTtm);
        assert_eq!("eps_yoy_ttm".parse::<SortColumn>().unwrap(), SortColumn::EpsYoyTtm);
        assert!("beta".parse::<SortColumn>().is_err());
        for column in SortColumn::ALL {
            assert_eq!(column.identifier().parse::<SortColumn>().unwrap(), column);
            assert_eq!(column.label().parse::<SortColumn>().unwrap(), column);
        }
    }

    #[test]
    fn parses_filters_and_directions() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("Mega Cap".parse::<CategoryFilter>().unwrap(), CategoryFilter::MegaCap);
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Descending);
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    // ── Filtering ──

    #[test]
    fn category_and_search_are_conjunctive() {
        let snapshot = sample();
        let state = ViewState::new().filtered(CategoryFilter::MidCap);
        assert_eq!(tickers(&view(&snapshot, &state)), vec!["AAA", "CCC"]);

        let state = state.searching(" cc ");
        assert_eq!(tickers(&view(&snapshot, &state)), vec!["CCC"]);

        let state = ViewState::new().filtered(CategoryFilter::LargeCap).searching("aaa");
        assert!(view(&snapshot, &state).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let snapshot = sample();
        let state = ViewState::new().searching("s");
        assert_eq!(tickers(&view(&snapshot, &state)), vec!["MSFT"]);
    }

    // ── Sorting ──

    #[test]
    fn market_cap_descending() {
        let snapshot = sample();
        let state = ViewState::new().sorted_by(SortColumn::MarketCap, SortDirection::Descending);
        assert_eq!(
            tickers(&view(&snapshot, &state)),
            vec!["MSFT", "BBB", "ZZZ", "AAA", "CCC"]
        );
    }

    #[test]
    fn absent_values_last_in_both_directions() {
        let snapshot = sample();
        let asc = ViewState::new().sorted_by(SortColumn::EpsYoyTtm, SortDirection::Ascending);
        assert_eq!(
            tickers(&view(&snapshot, &asc)),
            vec!["ZZZ", "MSFT", "BBB", "AAA", "CCC"]
        );
        let desc = asc.sorted_by(SortColumn::EpsYoyTtm, SortDirection::Descending);
        assert_eq!(
            tickers(&view(&snapshot, &desc)),
            vec!["BBB", "MSFT", "ZZZ", "AAA", "CCC"]
        );
    }

    #[test]
    fn category_sorts_by_label_text() {
        let snapshot = sample();
        let state = ViewState::new().sorted_by(SortColumn::Category, SortDirection::Ascending);
        // "large cap" < "mega cap" < "mid cap"
        assert_eq!(
            tickers(&view(&snapshot, &state)),
            vec!["ZZZ", "BBB", "MSFT", "AAA", "CCC"]
        );
    }

    #[test]
    fn ties_break_by_ticker_ascending_even_when_descending() {
        let snapshot = Snapshot::new(
            ts(),
            vec![
                equity("BBB", 5e9, with_yoy(Some(1.0))),
                equity("AAA", 5e9, with_yoy(Some(1.0))),
            ],
        )
        .unwrap();
        let state = ViewState::new().sorted_by(SortColumn::MarketCap, SortDirection::Descending);
        assert_eq!(tickers(&view(&snapshot, &state)), vec!["AAA", "BBB"]);
    }

    #[test]
    fn earnings_dates_order_by_day_then_session() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        let dated = |date, session| Fundamentals {
            next_earnings: Some(EarningsDate::new(date, session)),
            ..Fundamentals::default()
        };
        let snapshot = Snapshot::new(
            ts(),
            vec![
                equity("LATE", 5e9, dated(d(30), None)),
                equity("AMC", 5e9, dated(d(29), Some(MarketSession::AfterClose))),
                equity("NONE", 5e9, Fundamentals::default()),
                equity("BMO", 5e9, dated(d(29), Some(MarketSession::BeforeOpen))),
            ],
        )
        .unwrap();
        let state = ViewState::new().sorted_by(SortColumn::NextEarnings, SortDirection::Ascending);
        assert_eq!(
            tickers(&view(&snapshot, &state)),
            vec!["BMO", "AMC", "LATE", "NONE"]
        );
    }

    #[test]
    fn revisions_sort_by_net() {
        let revised = |up, down| Fundamentals {
            eps_revisions: RevisionSignal::Counts { up, down },
            ..Fundamentals::default()
        };
        let snapshot = Snapshot::new(
            ts(),
            vec![
                equity("DOWN", 5e9, revised(0, 3)),
                equity("NONE", 5e9, Fundamentals::default()),
                equity("UP", 5e9, revised(5, 1)),
                equity("FLAT", 5e9, revised(2, 2)),
            ],
        )
        .unwrap();
        let state = ViewState::new().sorted_by(SortColumn::Revisions, SortDirection::Descending);
        assert_eq!(
            tickers(&view(&snapshot, &state)),
            vec!["UP", "FLAT", "DOWN", "NONE"]
        );
    }

    #[test]
    fn view_is_idempotent_and_leaves_snapshot_untouched() {
        let snapshot = sample();
        let before = snapshot.clone();
        let state = ViewState::new().sorted_by(SortColumn::EpsYoyTtm, SortDirection::Descending);
        let first = tickers(&view(&snapshot, &state));
        let second = tickers(&view(&snapshot, &state));
        assert_eq!(first, second);
        assert_eq!(snapshot, before);
    }
}
