//! Two-phase selection queue.
//!
//! Candidates are ordered priority-first while the block's reserved
//! priority space fills, then fee-first for the remainder. The
//! transition is one-way; the underlying heap is rebuilt under the new
//! comparator and already-popped elements are unaffected.

use crate::domain::candidates::Candidate;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Active ordering criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderingMode {
    /// Priority descending, ties broken by fee rate descending.
    Priority,
    /// Fee rate descending, ties broken by priority descending.
    /// Terminal: there is no transition back.
    Fee,
}

/// Heap wrapper ordering by priority, then fee rate, then txid.
#[derive(Debug)]
struct ByPriority(Candidate);

/// Heap wrapper ordering by fee rate, then priority, then txid.
#[derive(Debug)]
struct ByFee(Candidate);

fn priority_key(a: &Candidate, b: &Candidate) -> Ordering {
    a.priority
        .total_cmp(&b.priority)
        .then_with(|| a.fee_rate.cmp(&b.fee_rate))
        // Smaller txid wins ties, keeping selection deterministic.
        .then_with(|| b.txid.cmp(&a.txid))
}

fn fee_key(a: &Candidate, b: &Candidate) -> Ordering {
    a.fee_rate
        .cmp(&b.fee_rate)
        .then_with(|| a.priority.total_cmp(&b.priority))
        .then_with(|| b.txid.cmp(&a.txid))
}

impl Ord for ByPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        priority_key(&self.0, &other.0)
    }
}

impl PartialOrd for ByPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ByPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByPriority {}

impl Ord for ByFee {
    fn cmp(&self, other: &Self) -> Ordering {
        fee_key(&self.0, &other.0)
    }
}

impl PartialOrd for ByFee {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ByFee {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByFee {}

/// Priority structure over candidates with a one-way ordering
/// transition.
#[derive(Debug)]
pub struct SelectionQueue {
    mode: OrderingMode,
    by_priority: BinaryHeap<ByPriority>,
    by_fee: BinaryHeap<ByFee>,
}

impl SelectionQueue {
    /// Creates a queue over the initial candidates in the given mode.
    pub fn new(mode: OrderingMode, candidates: Vec<Candidate>) -> Self {
        let mut queue = Self {
            mode,
            by_priority: BinaryHeap::new(),
            by_fee: BinaryHeap::new(),
        };
        for candidate in candidates {
            queue.push(candidate);
        }
        queue
    }

    /// The active ordering mode.
    pub fn mode(&self) -> OrderingMode {
        self.mode
    }

    /// Number of queued candidates.
    pub fn len(&self) -> usize {
        match self.mode {
            OrderingMode::Priority => self.by_priority.len(),
            OrderingMode::Fee => self.by_fee.len(),
        }
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues a candidate under the active comparator.
    pub fn push(&mut self, candidate: Candidate) {
        match self.mode {
            OrderingMode::Priority => self.by_priority.push(ByPriority(candidate)),
            OrderingMode::Fee => self.by_fee.push(ByFee(candidate)),
        }
    }

    /// Pops the best candidate under the active comparator.
    pub fn pop(&mut self) -> Option<Candidate> {
        match self.mode {
            OrderingMode::Priority => self.by_priority.pop().map(|entry| entry.0),
            OrderingMode::Fee => self.by_fee.pop().map(|entry| entry.0),
        }
    }

    /// Switches to fee ordering, rebuilding the heap in place. No-op if
    /// already in fee mode; there is no way back.
    pub fn switch_to_fee_ordering(&mut self) {
        if self.mode == OrderingMode::Fee {
            return;
        }
        self.mode = OrderingMode::Fee;
        self.by_fee
            .extend(self.by_priority.drain().map(|entry| ByFee(entry.0)));
    }
}
