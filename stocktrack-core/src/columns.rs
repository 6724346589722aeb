//! Upstream column table.
//!
//! The screener delivers a fixed set of columns. Each one maps to exactly one
//! [`ColumnType`], and the parser for a cell is chosen from this table rather
//! than by inspecting the cell text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value shape of a column; selects the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Currency,
    Percentage,
    /// Two concatenated percentage tokens, e.g. `6.24%3.88%`.
    PercentagePair,
    Date,
    Count,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Ticker,
    MarketCap,
    NextEarnings,
    EpsYoyTtm,
    SalesYoyTtm,
    EpsQoq,
    SalesQoq,
    EpsSalesSurprise,
    EpsSurprise,
    SalesSurprise,
    QuarterlyEpsEstimate,
    QuarterlyEpsReported,
    QuarterlyRevenueEstimate,
    QuarterlyRevenueReported,
    AnnualRevenueEstimate,
    AnnualRevenueReported,
    EpsRevisionsUp,
    EpsRevisionsDown,
    SalesRevisionsUp,
    SalesRevisionsDown,
    AvgTargetPrice,
}

impl Column {
    pub const ALL: [Column; 21] = [
        Self::Ticker,
        Self::MarketCap,
        Self::NextEarnings,
        Self::EpsYoyTtm,
        Self::SalesYoyTtm,
        Self::EpsQoq,
        Self::SalesQoq,
        Self::EpsSalesSurprise,
        Self::EpsSurprise,
        Self::SalesSurprise,
        Self::QuarterlyEpsEstimate,
        Self::QuarterlyEpsReported,
        Self::QuarterlyRevenueEstimate,
        Self::QuarterlyRevenueReported,
        Self::AnnualRevenueEstimate,
        Self::AnnualRevenueReported,
        Self::EpsRevisionsUp,
        Self::EpsRevisionsDown,
        Self::SalesRevisionsUp,
        Self::SalesRevisionsDown,
        Self::AvgTargetPrice,
    ];

    /// Columns a row cannot be admitted without.
    pub const REQUIRED: [Column; 2] = [Self::Ticker, Self::MarketCap];

    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Ticker => ColumnType::Text,
            Self::MarketCap
            | Self::QuarterlyEpsEstimate
            | Self::QuarterlyEpsReported
            | Self::QuarterlyRevenueEstimate
            | Self::QuarterlyRevenueReported
            | Self::AnnualRevenueEstimate
            | Self::AnnualRevenueReported
            | Self::AvgTargetPrice => ColumnType::Currency,
            Self::EpsYoyTtm
            | Self::SalesYoyTtm
            | Self::EpsQoq
            | Self::SalesQoq
            | Self::EpsSurprise
            | Self::SalesSurprise => ColumnType::Percentage,
            Self::EpsSalesSurprise => ColumnType::PercentagePair,
            Self::NextEarnings => ColumnType::Date,
            Self::EpsRevisionsUp
            | Self::EpsRevisionsDown
            | Self::SalesRevisionsUp
            | Self::SalesRevisionsDown => ColumnType::Count,
        }
    }

    /// Canonical upstream header.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Ticker => "Ticker",
            Self::MarketCap => "Market Cap",
            Self::NextEarnings => "Earnings",
            Self::EpsYoyTtm => "EPS Y/Y TTM",
            Self::SalesYoyTtm => "Sales Y/Y TTM",
            Self::EpsQoq => "EPS Q/Q",
            Self::SalesQoq => "Sales Q/Q",
            Self::EpsSalesSurprise => "EPS/Sales Surpr.",
            Self::EpsSurprise => "EPS Surpr.",
            Self::SalesSurprise => "Sales Surpr.",
            Self::QuarterlyEpsEstimate => "EPS Q Estimate",
            Self::QuarterlyEpsReported => "EPS Q Reported",
            Self::QuarterlyRevenueEstimate => "Rev Q Est",
            Self::QuarterlyRevenueReported => "Rev Q Rep",
            Self::AnnualRevenueEstimate => "Rev Ann Est",
            Self::AnnualRevenueReported => "Rev Ann Rep",
            Self::EpsRevisionsUp => "EPS Up",
            Self::EpsRevisionsDown => "EPS Down",
            Self::SalesRevisionsUp => "Sales Up",
            Self::SalesRevisionsDown => "Sales Down",
            Self::AvgTargetPrice => "Target Price",
        }
    }

    /// Additional accepted headers, already normalized (see [`normalize_header`]).
    ///
    /// Includes the keys of the scraper's flattened JSON records, where
    /// `eps_q_rep`/`sales_q_rep` carry the Q/Q growth percentages and the
    /// combined surprise field arrives already split.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Ticker => &["symbol"],
            Self::MarketCap => &["mkt cap", "market capitalization"],
            Self::NextEarnings => &["next earnings", "earnings date", "next earnings date"],
            Self::EpsYoyTtm => &["eps yy ttm", "eps yoy ttm"],
            Self::SalesYoyTtm => &["sales yy ttm", "sales yoy ttm"],
            Self::EpsQoq => &["eps q rep", "eps q rep yoy", "eps qq", "eps qoq"],
            Self::SalesQoq => &["sales q rep", "sales q rep yoy", "sales qq", "sales qoq"],
            Self::EpsSalesSurprise => &["eps/sales surprise", "eps sales surpr"],
            Self::EpsSurprise => &["eps surpr", "eps surprise"],
            Self::SalesSurprise => &["sales surpr", "sales surprise"],
            Self::QuarterlyEpsEstimate => &[
                "eps q est",
                "eps estimate",
                "quarterly eps estimate",
            ],
            Self::QuarterlyEpsReported => &["eps q act", "eps actual", "quarterly eps reported"],
            Self::QuarterlyRevenueEstimate => &[
                "revenue estimate",
                "sales estimate",
                "quarterly revenue estimate",
            ],
            Self::QuarterlyRevenueReported => &[
                "revenue actual",
                "sales actual",
                "quarterly revenue reported",
            ],
            Self::AnnualRevenueEstimate => &["annual revenue estimate"],
            Self::AnnualRevenueReported => &["annual revenue reported"],
            Self::EpsRevisionsUp => &["eps revisions up", "eps rev up"],
            Self::EpsRevisionsDown => &["eps revisions down", "eps dn", "eps rev down"],
            Self::SalesRevisionsUp => &["sales revisions up", "revenue up", "rev up"],
            Self::SalesRevisionsDown => &["sales revisions down", "revenue down", "rev down"],
            Self::AvgTargetPrice => &["avg target price", "avg target"],
        }
    }

    /// Resolve an upstream header. Matching ignores case, surrounding
    /// whitespace, and `_`/`-` versus space.
    pub fn from_header(header: &str) -> Option<Column> {
        let key = normalize_header(header);
        Self::ALL.into_iter().find(|column| {
            normalize_header(column.header()) == key || column.aliases().contains(&key.as_str())
        })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Lowercase, map `_`/`-` to spaces, collapse runs of whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(|c: char| c == '_' || c == '-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
