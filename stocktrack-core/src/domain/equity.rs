//! Equity — one row of the screener table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::CapCategory;
use super::ids::Ticker;
use crate::derive::{derive_category, derive_surprise, DeriveError};

/// Earnings-call timing relative to the trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketSession {
    /// Before market open (`BMO`).
    BeforeOpen,
    /// After market close (`AMC`).
    AfterClose,
}

impl MarketSession {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::BeforeOpen => "BMO",
            Self::AfterClose => "AMC",
        }
    }
}

/// Next earnings date with the optional session marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EarningsDate {
    pub date: NaiveDate,
    pub session: Option<MarketSession>,
}

impl EarningsDate {
    pub fn new(date: NaiveDate, session: Option<MarketSession>) -> Self {
        Self { date, session }
    }

    /// Chronological key: same-day calls order BMO, AMC, then unmarked.
    pub fn sort_key(&self) -> (NaiveDate, u8) {
        let slot = match self.session {
            Some(MarketSession::BeforeOpen) => 0,
            Some(MarketSession::AfterClose) => 1,
            None => 2,
        };
        (self.date, slot)
    }
}

impl fmt::Display for EarningsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%b %d, %Y"))?;
        if let Some(session) = self.session {
            write!(f, " {}", session.marker())?;
        }
        Ok(())
    }
}

/// Paired (estimate, reported) figures for one reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimateReport {
    pub estimate: Option<f64>,
    pub reported: Option<f64>,
}

impl EstimateReport {
    pub fn new(estimate: Option<f64>, reported: Option<f64>) -> Self {
        Self { estimate, reported }
    }

    /// Relative surprise of the reported figure over the estimate, in percent.
    pub fn surprise(&self) -> Option<f64> {
        derive_surprise(self.estimate, self.reported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionDirection {
    Up,
    Down,
    Flat,
}

/// Analyst estimate revisions over the trailing window.
///
/// `Absent` means upstream published no revision data at all, which is not the
/// same thing as `Counts { up: 0, down: 0 }` (data present, nothing revised).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RevisionSignal {
    #[default]
    Absent,
    Counts { up: u32, down: u32 },
}

impl RevisionSignal {
    pub fn counts(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Absent => None,
            Self::Counts { up, down } => Some((up, down)),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Up-revisions minus down-revisions.
    pub fn net(&self) -> Option<i64> {
        self.counts().map(|(up, down)| i64::from(up) - i64::from(down))
    }

    pub fn direction(&self) -> Option<RevisionDirection> {
        self.net().map(|net| match net {
            n if n > 0 => RevisionDirection::Up,
            n if n < 0 => RevisionDirection::Down,
            _ => RevisionDirection::Flat,
        })
    }

    /// Sum of two signals; absent only when both are.
    pub fn combine(self, other: Self) -> Self {
        match (self.counts(), other.counts()) {
            (None, None) => Self::Absent,
            (a, b) => {
                let (au, ad) = a.unwrap_or((0, 0));
                let (bu, bd) = b.unwrap_or((0, 0));
                Self::Counts {
                    up: au.saturating_add(bu),
                    down: ad.saturating_add(bd),
                }
            }
        }
    }
}

/// Everything on an equity row besides its identity and size.
///
/// Percentages are in percentage points (`10.0` is +10%).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    pub next_earnings: Option<EarningsDate>,
    pub eps_yoy_ttm: Option<f64>,
    pub sales_yoy_ttm: Option<f64>,
    pub eps_qoq: Option<f64>,
    pub sales_qoq: Option<f64>,
    pub eps_surprise: Option<f64>,
    pub sales_surprise: Option<f64>,
    pub quarterly_eps: EstimateReport,
    pub quarterly_revenue: EstimateReport,
    pub annual_revenue: EstimateReport,
    pub eps_revisions: RevisionSignal,
    pub sales_revisions: RevisionSignal,
    pub avg_target_price: Option<f64>,
}

/// A screened equity.
///
/// `market_cap` and `cap_category` are private: the category is derived once
/// from the market cap, here and on deserialization, and cannot be set apart
/// from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EquityRecord")]
pub struct Equity {
    pub ticker: Ticker,
    market_cap: f64,
    cap_category: CapCategory,
    #[serde(flatten)]
    pub fundamentals: Fundamentals,
}

impl Equity {
    /// Build an equity, deriving its category.
    ///
    /// Fails with `OutOfDomain` for market caps below the mid-cap floor.
    pub fn new(
        ticker: Ticker,
        market_cap: f64,
        fundamentals: Fundamentals,
    ) -> Result<Self, DeriveError> {
        let cap_category = derive_category(market_cap)?;
        Ok(Self {
            ticker,
            market_cap,
            cap_category,
            fundamentals,
        })
    }

    pub fn market_cap(&self) -> f64 {
        self.market_cap
    }

    pub fn cap_category(&self) -> CapCategory {
        self.cap_category
    }

    /// EPS and sales revisions combined.
    pub fn revisions_up_down(&self) -> RevisionSignal {
        self.fundamentals
            .eps_revisions
            .combine(self.fundamentals.sales_revisions)
    }
}

/// Wire form of an equity; any serialized category is ignored and re-derived.
#[derive(Deserialize)]
struct EquityRecord {
    ticker: Ticker,
    market_cap: f64,
    #[serde(flatten)]
    fundamentals: Fundamentals,
}

impl TryFrom<EquityRecord> for Equity {
    type Error = DeriveError;

    fn try_from(record: EquityRecord) -> Result<Self, Self::Error> {
        Equity::new(record.ticker, record.market_cap, record.fundamentals)
    }
}
