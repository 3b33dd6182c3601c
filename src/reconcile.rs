//! Confirm-or-reload bookkeeping for reorder batches.
//!
//! Every move goes through two phases: a tentative local apply, then a batch
//! of remote updates whose joined outcome either confirms the local state or
//! forces a reload. Keys within a column depend on each other, so a batch with
//! any failed update cannot be partially rolled back; the only consistent
//! recovery is to replace local state with a fresh `list()`.

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteError;
use crate::types::{ItemId, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Identifier of one move's update batch.
pub type BatchId = u64;

/// Whether local state is known to match the remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum SyncPhase {
    /// Everything local has been persisted, as far as is known.
    Confirmed,
    /// At least one move is unsettled, or a failed batch could not be
    /// followed by a successful reload.
    Optimistic { pending: usize },
}

/// How to treat a move that touches a column with an unsettled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Let batches overlap. A slow batch's failure reload may clobber a later
    /// move's optimistic state.
    #[default]
    Allow,
    /// Refuse the move until the column's previous batch has settled.
    Reject,
}

impl OverlapPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Some(OverlapPolicy::Allow),
            "reject" | "serialize" => Some(OverlapPolicy::Reject),
            _ => None,
        }
    }
}

/// Joined outcome of every update call in one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: BatchId,
    /// Ids sent, in issue order.
    pub attempted: Vec<ItemId>,
    pub failures: Vec<(ItemId, RemoteError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.attempted.len() - self.failures.len()
    }
}

/// What the board must do with a settled batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Confirm,
    Reload(SyncError),
}

/// Tracks unsettled batches and whether a reload is owed.
#[derive(Debug, Default)]
pub struct Tracker {
    next_id: BatchId,
    in_flight: BTreeMap<BatchId, Vec<Status>>,
    /// A failed batch could not be followed by a successful reload.
    stale: bool,
    overlap: OverlapPolicy,
}

impl Tracker {
    pub fn new(overlap: OverlapPolicy) -> Self {
        Self {
            overlap,
            ..Self::default()
        }
    }

    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap
    }

    pub fn phase(&self) -> SyncPhase {
        if self.in_flight.is_empty() && !self.stale {
            SyncPhase::Confirmed
        } else {
            SyncPhase::Optimistic {
                pending: self.in_flight.len(),
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Refuse a move under `OverlapPolicy::Reject` if any of its columns is busy.
    pub fn check(&self, statuses: &[Status]) -> SyncResult<()> {
        if self.overlap == OverlapPolicy::Allow {
            return Ok(());
        }
        for status in statuses {
            if self.in_flight.values().any(|busy| busy.contains(status)) {
                return Err(SyncError::batch_in_flight(status));
            }
        }
        Ok(())
    }

    /// Register a batch for the given columns; the move has already been applied locally.
    pub fn begin(&mut self, statuses: Vec<Status>) -> BatchId {
        self.next_id += 1;
        let id = self.next_id;
        self.in_flight.insert(id, statuses);
        debug!(batch_id = id, in_flight = self.in_flight.len(), "Batch started");
        id
    }

    /// Close a batch. Any failure means the whole batch is treated as failed.
    /// Settling an unknown or already-settled batch is allowed (e.g. a retry).
    pub fn settle(&mut self, report: &BatchReport) -> Verdict {
        self.in_flight.remove(&report.batch_id);
        if report.is_success() {
            debug!(
                batch_id = report.batch_id,
                updated = report.attempted.len(),
                "Batch confirmed"
            );
            Verdict::Confirm
        } else {
            Verdict::Reload(SyncError::batch_failed(
                &report.failures,
                report.attempted.len(),
            ))
        }
    }

    /// Forget a batch that will never be settled.
    pub fn release(&mut self, batch_id: BatchId) -> bool {
        let released = self.in_flight.remove(&batch_id).is_some();
        if released {
            debug!(batch_id, in_flight = self.in_flight.len(), "Batch released");
        }
        released
    }

    /// A failure reload replaced local state with the remote contents.
    ///
    /// Other batches stay registered; their updates may still be running.
    pub fn mark_reloaded(&mut self) {
        self.stale = false;
    }

    /// A full load superseded every optimistic change, settled or not.
    pub fn reset(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(dropped = self.in_flight.len(), "Load superseded unsettled batches");
        }
        self.in_flight.clear();
        self.stale = false;
    }

    /// A reload that was owed did not happen.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }
}
