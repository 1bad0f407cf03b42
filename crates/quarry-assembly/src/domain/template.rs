//! The assembled block template.

use crate::domain::coinbase::coinbase_script_sig;
use quarry_types::{derive_block_commitments, Amount, Block, Hash};

/// The output of a template build: the block with its ordered
/// transaction list (reward transaction first), parallel per-transaction
/// fee and sigop bookkeeping, running totals, and the commitment roots.
///
/// Owned exclusively by the assembler during construction; an immutable
/// handoff value once returned, except for the extra-nonce refresh the
/// mining loop performs between search attempts.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    /// The assembled block. Header nonce and solution are left for the
    /// mining loop.
    pub block: Block,
    /// Net fee per transaction; entry 0 is the negated fee total.
    pub tx_fees: Vec<Amount>,
    /// Sigop count per transaction.
    pub tx_sigops: Vec<u32>,
    /// Height this template builds at.
    pub height: u32,
    /// Total serialized size including the coinbase reservation.
    pub total_size: usize,
    /// Fees collected from the included pool transactions.
    pub total_fees: Amount,
    /// Chain-history root as of the parent tip.
    pub chain_history_root: Hash,
    /// Merkle root over the transactions' authorizing data.
    pub auth_data_root: Hash,
}

impl BlockTemplate {
    /// Number of transactions excluding the coinbase.
    pub fn pool_transaction_count(&self) -> usize {
        self.block.transactions.len().saturating_sub(1)
    }

    /// Rewrites the coinbase extra nonce and refreshes every commitment
    /// that depends on the transaction set.
    pub fn apply_extra_nonce(&mut self, extra_nonce: u32) {
        let height = self.height;
        if let Some(coinbase) = self.block.transactions.first_mut() {
            coinbase.inputs[0].script_sig = coinbase_script_sig(height, extra_nonce);
        }
        self.refresh_commitments();
    }

    /// Recomputes the merkle root, auth-data root, and the derived
    /// block-commitments header field from the current transaction set.
    pub fn refresh_commitments(&mut self) {
        self.block.header.merkle_root = self.block.merkle_root();
        self.auth_data_root = self.block.auth_data_root();
        self.block.header.block_commitments =
            derive_block_commitments(&self.chain_history_root, &self.auth_data_root);
    }
}
