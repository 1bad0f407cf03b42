//! Dependency tracking for candidates blocked on other pending
//! transactions.
//!
//! A blocked candidate is held here until every producer it depends on
//! has been *included in the template*, not merely selected. That is
//! what keeps the final ordering topologically valid.

use crate::domain::candidates::Candidate;
use quarry_types::TxId;
use std::collections::{HashMap, HashSet};

/// A candidate plus the producers it still waits on. Owned exclusively
/// by the tracker; discarded on promotion.
#[derive(Clone, Debug)]
pub struct PendingRecord {
    /// The blocked candidate with its cached scheduling metadata.
    pub candidate: Candidate,
    /// Unresolved producer transaction ids.
    pub depends_on: HashSet<TxId>,
}

/// Tracks blocked candidates per producing transaction id.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    /// Blocked records keyed by the dependent's txid.
    records: HashMap<TxId, PendingRecord>,
    /// Producer txid -> dependents waiting on it.
    dependents: HashMap<TxId, Vec<TxId>>,
}

impl DependencyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tracker from an extraction pass's blocked records.
    pub fn from_records(records: Vec<PendingRecord>) -> Self {
        let mut tracker = Self::new();
        for record in records {
            tracker.insert(record);
        }
        tracker
    }

    /// Registers a blocked candidate.
    pub fn insert(&mut self, record: PendingRecord) {
        let txid = record.candidate.txid;
        for producer in &record.depends_on {
            self.dependents.entry(*producer).or_default().push(txid);
        }
        self.records.insert(txid, record);
    }

    /// Number of candidates still blocked.
    pub fn blocked_count(&self) -> usize {
        self.records.len()
    }

    /// Notifies the tracker that `producer` has been included in the
    /// template. Returns the candidates this unblocks, with their cached
    /// metadata, ready for the selection queue.
    pub fn on_included(&mut self, producer: &TxId) -> Vec<Candidate> {
        let mut promoted = Vec::new();
        let Some(waiting) = self.dependents.remove(producer) else {
            return promoted;
        };
        for dependent in waiting {
            let Some(record) = self.records.get_mut(&dependent) else {
                continue;
            };
            record.depends_on.remove(producer);
            if record.depends_on.is_empty() {
                let record = self
                    .records
                    .remove(&dependent)
                    .expect("record present: just mutated it");
                promoted.push(record.candidate);
            }
        }
        promoted
    }
}
