//! Snapshot store and the refresh cycle.
//!
//! A refresh loads rows, builds a complete snapshot, and only then swaps it
//! into the store. Readers hold an `Arc<Snapshot>` and never see a partial
//! build; a failed refresh leaves the previous snapshot current.

use chrono::NaiveDateTime;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use stocktrack_core::{aggregate, AggregateError, BuildReport, Snapshot};

use crate::source::{RowSource, SourceError};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("loading rows failed: {0}")]
    Load(#[from] SourceError),

    #[error("building snapshot failed: {0}")]
    Build(#[from] AggregateError),
}

/// Holder of the current snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a previously persisted snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new snapshot, returning the one it replaced.
    pub fn replace(&self, snapshot: Arc<Snapshot>) -> Option<Arc<Snapshot>> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_none()
    }
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub snapshot: Arc<Snapshot>,
    pub report: BuildReport,
    pub fingerprint: String,
    /// False when the new snapshot's records match the previous one's.
    pub changed: bool,
    /// Description of the row source.
    pub origin: String,
}

/// Load rows from `source`, build a snapshot stamped `generated_at`, and swap
/// it into `store`.
pub fn refresh(
    source: &dyn RowSource,
    store: &SnapshotStore,
    generated_at: NaiveDateTime,
) -> Result<RefreshOutcome, RefreshError> {
    let origin = source.describe();
    let built = source
        .load()
        .map_err(RefreshError::from)
        .and_then(|rows| aggregate(&rows, generated_at).map_err(RefreshError::from));

    let (snapshot, report) = match built {
        Ok(built) => built,
        Err(e) => {
            warn!(source = %origin, error = %e, "refresh failed; keeping previous snapshot");
            return Err(e);
        }
    };

    let fingerprint = snapshot.fingerprint();
    let snapshot = Arc::new(snapshot);
    let previous = store.replace(Arc::clone(&snapshot));
    let changed = previous.map_or(true, |prev| prev.fingerprint() != fingerprint);

    info!(
        source = %origin,
        equities = snapshot.len(),
        dropped = report.dropped_total(),
        changed,
        fingerprint = %fingerprint,
        "snapshot refreshed"
    );

    Ok(RefreshOutcome {
        snapshot,
        report,
        fingerprint,
        changed,
        origin,
    })
}
