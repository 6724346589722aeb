//! Metric deriver: pure functions from base fields to derived ones.

use thiserror::Error;

use crate::domain::{
    CapCategory, RevisionSignal, LARGE_CAP_FLOOR, MEGA_CAP_FLOOR, MID_CAP_FLOOR,
};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DeriveError {
    #[error("market cap {0} is below the $2B screening floor")]
    OutOfDomain(f64),
}

/// Cap band of a market cap. Fails below the mid-cap floor or for non-finite input.
pub fn derive_category(market_cap: f64) -> Result<CapCategory, DeriveError> {
    if !market_cap.is_finite() || market_cap < MID_CAP_FLOOR {
        return Err(DeriveError::OutOfDomain(market_cap));
    }
    Ok(if market_cap >= MEGA_CAP_FLOOR {
        CapCategory::MegaCap
    } else if market_cap >= LARGE_CAP_FLOOR {
        CapCategory::LargeCap
    } else {
        CapCategory::MidCap
    })
}

/// `(reported - estimate) / |estimate|` in percentage points.
///
/// Absent when either side is absent or the estimate is zero.
pub fn derive_surprise(estimate: Option<f64>, reported: Option<f64>) -> Option<f64> {
    let (estimate, reported) = (estimate?, reported?);
    if estimate == 0.0 || !estimate.is_finite() || !reported.is_finite() {
        return None;
    }
    let surprise = (reported - estimate) / estimate.abs() * 100.0;
    surprise.is_finite().then_some(surprise)
}

/// Revision signal from up/down counts. A missing side counts as zero unless
/// both are missing.
pub fn derive_revisions(up: Option<u32>, down: Option<u32>) -> RevisionSignal {
    match (up, down) {
        (None, None) => RevisionSignal::Absent,
        (up, down) => RevisionSignal::Counts {
            up: up.unwrap_or(0),
            down: down.unwrap_or(0),
        },
    }
}
