//! Candidate extraction.
//!
//! Snapshots the pending pool and derives per-transaction scheduling
//! metadata: priority (age-weighted input value over modified size),
//! fee rate, absolute fee, and the set of unresolved in-pool
//! dependencies.

use crate::domain::dependencies::PendingRecord;
use crate::error::{AssemblyError, Result};
use crate::ports::{LedgerView, PendingPool};
use quarry_types::{Amount, FeeRate, TipInfo, Transaction, TxId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

/// Priority above which a transaction counts as high-priority: a
/// one-coin input aged one day (144 blocks) on a typical 250-byte
/// transaction.
pub const FREE_PRIORITY_THRESHOLD: f64 = quarry_types::COIN as f64 * 144.0 / 250.0;

/// Whether `priority` qualifies for free admission.
pub fn allow_free(priority: f64) -> bool {
    priority > FREE_PRIORITY_THRESHOLD
}

/// A pending transaction with derived scheduling metadata. Created once
/// per selection pass; the metadata is cached and never recomputed, even
/// when the candidate waits on dependencies.
#[derive(Clone, Debug)]
pub struct Candidate {
    /// The transaction itself.
    pub tx: Transaction,
    /// Cached transaction id.
    pub txid: TxId,
    /// Age-weighted input value divided by modified size.
    pub priority: f64,
    /// Fee per 1000 bytes.
    pub fee_rate: FeeRate,
    /// Absolute fee in zatoshi.
    pub fee_paid: Amount,
    /// Serialized size in bytes.
    pub size: usize,
}

/// Result of an extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Candidates whose inputs all resolve against the ledger.
    pub ready: Vec<Candidate>,
    /// Candidates blocked on at least one other pending transaction.
    pub blocked: Vec<PendingRecord>,
}

/// Extracts candidates from a pool snapshot against the ledger view at
/// the tip.
///
/// Reward transactions, non-final transactions, and expired transactions
/// are excluded up front. An input that resolves against neither the
/// ledger nor the pending set is a pool-integrity violation and aborts
/// the build.
pub fn extract_candidates(
    view: &dyn LedgerView,
    pool: &dyn PendingPool,
    tip: &TipInfo,
) -> Result<Extraction> {
    let snapshot = pool.snapshot();
    let height = tip.next_height();
    let cutoff_time = tip.median_time_past;

    let by_id: HashMap<TxId, &Transaction> =
        snapshot.iter().map(|tx| (tx.txid(), tx)).collect();

    let mut extraction = Extraction::default();

    for tx in &snapshot {
        let txid = tx.txid();

        if tx.is_coinbase() {
            debug!(txid = %quarry_types::short_hash(&txid), "skipping reward transaction in pool");
            continue;
        }
        if !tx.is_final_at(height, cutoff_time) {
            debug!(txid = %quarry_types::short_hash(&txid), "skipping non-final transaction");
            continue;
        }
        if tx.is_expired_at(height) {
            debug!(txid = %quarry_types::short_hash(&txid), "skipping expired transaction");
            continue;
        }

        let mut priority = 0f64;
        let mut total_in: Amount = 0;
        let mut depends_on: HashSet<TxId> = HashSet::new();

        for input in &tx.inputs {
            if let Some(coin) = view.spendable_output(&input.prevout) {
                let confirmations = height.saturating_sub(coin.height);
                priority += coin.value as f64 * confirmations as f64;
                total_in += coin.value;
            } else if let Some(producer) = by_id.get(&input.prevout.txid) {
                // Input comes from another pending transaction: the
                // candidate has to wait for its dependency. Zero age, so
                // it contributes nothing to priority.
                let spent = producer
                    .outputs
                    .get(input.prevout.index as usize)
                    .ok_or_else(|| pool_integrity(&txid, &input.prevout.txid, input.prevout.index))?;
                total_in += spent.value;
                depends_on.insert(input.prevout.txid);
            } else {
                // Every pooled transaction must connect to the chain or
                // to the pool itself. Anything else means the pool is
                // corrupt; a template built from it cannot be trusted.
                error!(
                    txid = %quarry_types::short_hash(&txid),
                    missing = %quarry_types::short_hash(&input.prevout.txid),
                    "pending transaction input resolves against neither ledger nor pool"
                );
                return Err(pool_integrity(&txid, &input.prevout.txid, input.prevout.index));
            }
        }
        total_in += tx.shielded_value_in();

        let size = tx.serialized_size();
        // Priority is sum(value_in * age) normalized by the modified
        // size, which discounts per-input overhead so consolidating old
        // coins is not penalized.
        priority /= tx.modified_size() as f64;

        let mut fee_delta: Amount = 0;
        pool.apply_deltas(&txid, &mut priority, &mut fee_delta);
        total_in += fee_delta;

        let fee_paid = total_in - tx.value_out();
        let fee_rate = FeeRate::new(fee_paid, size);

        let candidate = Candidate {
            tx: tx.clone(),
            txid,
            priority,
            fee_rate,
            fee_paid,
            size,
        };

        if depends_on.is_empty() {
            extraction.ready.push(candidate);
        } else {
            extraction.blocked.push(PendingRecord {
                candidate,
                depends_on,
            });
        }
    }

    Ok(extraction)
}

fn pool_integrity(txid: &TxId, missing: &TxId, index: u32) -> AssemblyError {
    AssemblyError::PoolIntegrity {
        txid: hex::encode(txid),
        missing_txid: hex::encode(missing),
        missing_index: index,
    }
}
