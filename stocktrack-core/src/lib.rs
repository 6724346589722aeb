//! Stocktrack Core — screener row normalization, derived metrics, and the view engine.
//!
//! This crate holds everything between "raw upstream cells" and "rows on screen":
//! - Column table mapping upstream headers to value types
//! - Field parser (currency magnitudes, percentages, dates, counts, placeholders)
//! - Metric deriver (cap category, surprise, revision signals)
//! - Record aggregator (admission, dedup, build report)
//! - Sort/filter engine over an immutable snapshot
//!
//! No I/O and no clock: the caller supplies rows and the generation timestamp.

pub mod aggregate;
pub mod columns;
pub mod derive;
pub mod domain;
pub mod parse;
pub mod row;
pub mod view;

pub use aggregate::{aggregate, build_snapshot, AggregateError, BuildReport, DropReason};
pub use columns::{Column, ColumnType};
pub use derive::{derive_category, derive_revisions, derive_surprise, DeriveError};
pub use domain::{CapCategory, Equity, Fundamentals, Snapshot, Ticker};
pub use parse::{parse, Field, ParseFailure, TypedValue};
pub use row::RawRow;
pub use view::{view, CategoryFilter, SortColumn, SortDirection, SortKey, ViewState};
