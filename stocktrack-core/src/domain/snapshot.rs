//! Snapshot — one immutable generation of the screened equity set.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::category::CapCategory;
use super::equity::Equity;
use super::ids::Ticker;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("duplicate ticker in snapshot: {0}")]
    DuplicateTicker(Ticker),
}

/// Number of equities per cap band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub mid_cap: usize,
    pub large_cap: usize,
    pub mega_cap: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: CapCategory) -> usize {
        match category {
            CapCategory::MidCap => self.mid_cap,
            CapCategory::LargeCap => self.large_cap,
            CapCategory::MegaCap => self.mega_cap,
        }
    }

    pub fn total(&self) -> usize {
        self.mid_cap + self.large_cap + self.mega_cap
    }
}

/// Ordered equities (source order) plus the generation timestamp.
///
/// There is no way to mutate a snapshot once built; a refresh produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct Snapshot {
    generated_at: NaiveDateTime,
    equities: Vec<Equity>,
}

impl Snapshot {
    /// Build a snapshot. Tickers must be unique.
    pub fn new(generated_at: NaiveDateTime, equities: Vec<Equity>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(equities.len());
        for equity in &equities {
            if !seen.insert(&equity.ticker) {
                return Err(SnapshotError::DuplicateTicker(equity.ticker.clone()));
            }
        }
        Ok(Self {
            generated_at,
            equities,
        })
    }

    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    pub fn equities(&self) -> &[Equity] {
        &self.equities
    }

    pub fn len(&self) -> usize {
        self.equities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equities.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&Equity> {
        self.equities
            .iter()
            .find(|e| e.ticker.as_str().eq_ignore_ascii_case(ticker.trim()))
    }

    pub fn category_counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for equity in &self.equities {
            match equity.cap_category() {
                CapCategory::MidCap => counts.mid_cap += 1,
                CapCategory::LargeCap => counts.large_cap += 1,
                CapCategory::MegaCap => counts.mega_cap += 1,
            }
        }
        counts
    }

    /// Content hash of the equity records (timestamp excluded).
    ///
    /// Two runs over identical upstream data produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(&self.equities).expect("Equity serialization failed");
        blake3::hash(&json).to_hex().to_string()
    }
}

#[derive(Deserialize)]
struct SnapshotRecord {
    generated_at: NaiveDateTime,
    equities: Vec<Equity>,
}

impl TryFrom<SnapshotRecord> for Snapshot {
    type Error = SnapshotError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        Snapshot::new(record.generated_at, record.equities)
    }
}
