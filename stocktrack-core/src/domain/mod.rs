//! Domain types: tickers, cap bands, equities, snapshots.

pub mod category;
pub mod equity;
pub mod ids;
pub mod snapshot;

pub use category::{CapCategory, LARGE_CAP_FLOOR, MEGA_CAP_FLOOR, MID_CAP_FLOOR};
pub use equity::{
    EarningsDate, Equity, EstimateReport, Fundamentals, MarketSession, RevisionDirection,
    RevisionSignal,
};
pub use ids::{Ticker, TickerError};
pub use snapshot::{CategoryCounts, Snapshot, SnapshotError};
