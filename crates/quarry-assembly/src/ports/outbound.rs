//! Outbound ports (driven side).
//!
//! All calls are synchronous: a template build holds the ledger-wide
//! lock for its whole duration, so collaborators are plain trait objects
//! rather than async services.

use quarry_types::{Amount, Hash, OutPoint, OutputDescription, Transaction, TxId};
use thiserror::Error;

/// A spendable output as seen by the working ledger view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpentOutput {
    /// Output value.
    pub value: Amount,
    /// Locking script of the spent output.
    pub script_pubkey: Vec<u8>,
    /// Height at which the producing transaction confirmed.
    pub height: u32,
}

/// Port: the working ledger view a template build runs against.
///
/// Implementations layer a scratch overlay over the confirmed coin set;
/// [`LedgerView::apply_transaction`] mutates only the overlay.
pub trait LedgerView: Send {
    /// Resolves a spendable output, from the confirmed set or from a
    /// transaction applied earlier in this build.
    fn spendable_output(&self, outpoint: &OutPoint) -> Option<SpentOutput>;

    /// Spends a transaction's inputs and adds its outputs to the view.
    fn apply_transaction(&mut self, tx: &Transaction, height: u32);

    /// Full contextual script/consensus validation under the rules
    /// active at `height`. Returns the reject reason on failure.
    fn contextual_check(&self, tx: &Transaction, height: u32) -> std::result::Result<(), String>;

    /// Chain-history commitment root as of the parent tip.
    fn history_root(&self) -> Hash;

    /// Whether every transparent input resolves against this view.
    fn have_inputs(&self, tx: &Transaction) -> bool {
        tx.inputs
            .iter()
            .all(|input| self.spendable_output(&input.prevout).is_some())
    }

    /// Total transparent value consumed by `tx` from this view. `None`
    /// when an input does not resolve.
    fn value_in(&self, tx: &Transaction) -> Option<Amount> {
        let mut total: Amount = 0;
        for input in &tx.inputs {
            total += self.spendable_output(&input.prevout)?.value;
        }
        Some(total)
    }
}

/// Port: read access to the pending-transaction pool.
pub trait PendingPool: Send + Sync {
    /// Snapshot of the current pending transactions.
    fn snapshot(&self) -> Vec<Transaction>;

    /// Applies any operator-configured priority/fee override deltas for
    /// `txid` to the provided accumulators.
    fn apply_deltas(&self, txid: &TxId, priority: &mut f64, fee: &mut Amount);

    /// Monotonic counter bumped on every pool mutation; the mining loop
    /// uses it for staleness timing.
    fn updates_counter(&self) -> u64;
}

/// A proof-service failure. Always fatal to the current coinbase build.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ProofFailure {
    /// What the proof backend reported.
    pub reason: String,
}

impl ProofFailure {
    /// Creates a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Port: the shielded proof backend. Opaque to the engine; every method
/// may fail and failure aborts the template build.
pub trait ProofService: Send + Sync {
    /// Builds a sapling output description paying `value` to the raw
    /// payment address `recipient`.
    fn sapling_output(
        &self,
        recipient: &[u8; 43],
        value: Amount,
    ) -> std::result::Result<OutputDescription, ProofFailure>;

    /// Builds, proves, and signs the orchard action set paying `value`
    /// to `recipient` (including the recoverable padding action), bound
    /// to `sighash`.
    fn orchard_reward_actions(
        &self,
        recipient: &[u8; 43],
        value: Amount,
        sighash: &Hash,
    ) -> std::result::Result<Vec<OutputDescription>, ProofFailure>;

    /// Aggregate binding signature over all shielded value flows of the
    /// reward transaction.
    fn binding_signature(
        &self,
        value_balance: Amount,
        sighash: &Hash,
    ) -> std::result::Result<[u8; 64], ProofFailure>;
}
