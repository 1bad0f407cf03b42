//! Transaction model.
//!
//! Covers the transparent UTXO parts plus the shielded summaries the
//! assembly engine needs: legacy sprout transfer pairs and
//! sapling/orchard value balances with their output descriptions. Proofs
//! and signatures are opaque bytes produced by the proof-service
//! collaborator; the engine only moves them around.

use crate::amount::Amount;
use crate::script;
use crate::{sha256d, Hash, TxId};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Lock-time values below this threshold are block heights; values at or
/// above it are unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Reference to a spendable transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Producing transaction.
    pub txid: TxId,
    /// Output index within the producing transaction.
    pub index: u32,
}

impl OutPoint {
    /// Creates an outpoint.
    pub fn new(txid: TxId, index: u32) -> Self {
        Self { txid, index }
    }

    /// The null outpoint used by reward transactions.
    pub fn null() -> Self {
        Self {
            txid: [0u8; 32],
            index: u32::MAX,
        }
    }

    /// Whether this is the null outpoint.
    pub fn is_null(&self) -> bool {
        self.txid == [0u8; 32] && self.index == u32::MAX
    }
}

/// Transparent transaction input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    /// Spent output.
    pub prevout: OutPoint,
    /// Unlocking script.
    pub script_sig: Vec<u8>,
}

/// Transparent transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Value in zatoshi.
    pub value: Amount,
    /// Locking script.
    pub script_pubkey: Vec<u8>,
}

/// Legacy sprout transfer: a pair of public values moving between the
/// transparent and sprout pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SproutTransfer {
    /// Transparent value entering the sprout pool.
    pub vpub_old: Amount,
    /// Sprout value leaving into the transparent pool.
    pub vpub_new: Amount,
}

/// Serialized weight charged per sprout transfer (proof material not
/// modeled here).
pub const SPROUT_TRANSFER_SIZE: usize = 1802;

/// A shielded output description, produced by the proof service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescription {
    /// Note commitment.
    pub cmu: Hash,
    /// Zero-knowledge proof bytes.
    pub proof: Vec<u8>,
    /// Encrypted note ciphertext.
    pub ciphertext: Vec<u8>,
}

impl OutputDescription {
    fn serialized_size(&self) -> usize {
        32 + 4 + self.proof.len() + 4 + self.ciphertext.len()
    }
}

/// A transaction: transparent inputs/outputs plus shielded summaries.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,
    /// Transparent inputs.
    pub inputs: Vec<TxIn>,
    /// Transparent outputs.
    pub outputs: Vec<TxOut>,
    /// Height or time before which the transaction is not final.
    pub lock_time: u32,
    /// Height after which the transaction expires (0 = never).
    pub expiry_height: u32,
    /// Legacy sprout transfers.
    pub sprout_transfers: Vec<SproutTransfer>,
    /// Net sapling value flow; positive = value leaving the sapling pool.
    pub sapling_value_balance: Amount,
    /// Sapling output descriptions.
    pub shielded_outputs: Vec<OutputDescription>,
    /// Net orchard value flow; positive = value leaving the orchard pool.
    pub orchard_value_balance: Amount,
    /// Orchard action descriptions.
    pub orchard_actions: Vec<OutputDescription>,
    /// Aggregate binding signature over all shielded value flows.
    #[serde_as(as = "Option<Bytes>")]
    pub binding_sig: Option<[u8; 64]>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: 4,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            expiry_height: 0,
            sprout_transfers: Vec::new(),
            sapling_value_balance: 0,
            shielded_outputs: Vec::new(),
            orchard_value_balance: 0,
            orchard_actions: Vec::new(),
            binding_sig: None,
        }
    }
}

impl Transaction {
    /// Computes the transaction id: SHA-256d over all effect fields.
    /// Authorizing data (proofs, binding signature) is excluded and
    /// committed to separately by [`Transaction::auth_digest`].
    pub fn txid(&self) -> TxId {
        let mut data = Vec::new();
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            data.extend_from_slice(&input.prevout.txid);
            data.extend_from_slice(&input.prevout.index.to_le_bytes());
            data.extend_from_slice(&(input.script_sig.len() as u32).to_le_bytes());
            data.extend_from_slice(&input.script_sig);
        }
        data.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_le_bytes());
            data.extend_from_slice(&(output.script_pubkey.len() as u32).to_le_bytes());
            data.extend_from_slice(&output.script_pubkey);
        }
        data.extend_from_slice(&self.lock_time.to_le_bytes());
        data.extend_from_slice(&self.expiry_height.to_le_bytes());
        for transfer in &self.sprout_transfers {
            data.extend_from_slice(&transfer.vpub_old.to_le_bytes());
            data.extend_from_slice(&transfer.vpub_new.to_le_bytes());
        }
        data.extend_from_slice(&self.sapling_value_balance.to_le_bytes());
        for odesc in &self.shielded_outputs {
            data.extend_from_slice(&odesc.cmu);
        }
        data.extend_from_slice(&self.orchard_value_balance.to_le_bytes());
        for action in &self.orchard_actions {
            data.extend_from_slice(&action.cmu);
        }
        sha256d(&data)
    }

    /// Commitment to the authorizing data: proofs, ciphertexts, and the
    /// binding signature.
    pub fn auth_digest(&self) -> Hash {
        let mut data = Vec::new();
        data.extend_from_slice(&self.txid());
        for odesc in self.shielded_outputs.iter().chain(&self.orchard_actions) {
            data.extend_from_slice(&odesc.proof);
            data.extend_from_slice(&odesc.ciphertext);
        }
        if let Some(sig) = &self.binding_sig {
            data.extend_from_slice(sig);
        }
        sha256d(&data)
    }

    /// Whether this is a reward (coinbase) transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Whether the transaction is final for a block at `height` with
    /// lock-time cutoff `cutoff_time`.
    pub fn is_final_at(&self, height: u32, cutoff_time: u64) -> bool {
        if self.lock_time == 0 {
            return true;
        }
        if self.lock_time < LOCKTIME_THRESHOLD {
            self.lock_time < height
        } else {
            (self.lock_time as u64) < cutoff_time
        }
    }

    /// Whether the transaction has expired at `height`. Reward
    /// transactions never expire.
    pub fn is_expired_at(&self, height: u32) -> bool {
        if self.expiry_height == 0 || self.is_coinbase() {
            return false;
        }
        height > self.expiry_height
    }

    /// Total value leaving this transaction: transparent outputs, sprout
    /// public inputs, and negative shielded value balances.
    pub fn value_out(&self) -> Amount {
        let mut total: Amount = self.outputs.iter().map(|o| o.value).sum();
        for transfer in &self.sprout_transfers {
            total += transfer.vpub_old;
        }
        if self.sapling_value_balance < 0 {
            total += -self.sapling_value_balance;
        }
        if self.orchard_value_balance < 0 {
            total += -self.orchard_value_balance;
        }
        total
    }

    /// Value entering this transaction from the shielded pools: sprout
    /// public outputs and positive shielded value balances.
    pub fn shielded_value_in(&self) -> Amount {
        let mut total: Amount = self.sprout_transfers.iter().map(|t| t.vpub_new).sum();
        if self.sapling_value_balance > 0 {
            total += self.sapling_value_balance;
        }
        if self.orchard_value_balance > 0 {
            total += self.orchard_value_balance;
        }
        total
    }

    /// Serialized size in bytes, computed from the field layout.
    pub fn serialized_size(&self) -> usize {
        let mut size = 4 + 4 + 4 + 8 + 8; // version, lock, expiry, balances
        size += 4;
        for input in &self.inputs {
            size += 36 + 4 + input.script_sig.len();
        }
        size += 4;
        for output in &self.outputs {
            size += 8 + 4 + output.script_pubkey.len();
        }
        size += self.sprout_transfers.len() * SPROUT_TRANSFER_SIZE;
        for odesc in self.shielded_outputs.iter().chain(&self.orchard_actions) {
            size += odesc.serialized_size();
        }
        if self.binding_sig.is_some() {
            size += 64;
        }
        size
    }

    /// Size used for priority normalization: the serialized size minus a
    /// per-input discount, so that spending many inputs does not by
    /// itself depress priority.
    pub fn modified_size(&self) -> usize {
        let mut size = self.serialized_size();
        for input in &self.inputs {
            let offset = 41 + input.script_sig.len().min(110);
            size = size.saturating_sub(offset);
        }
        size.max(1)
    }

    /// Legacy signature-operation count over all scripts, without
    /// resolving nested redeem scripts.
    pub fn legacy_sigops(&self) -> u32 {
        let mut count = 0u32;
        for input in &self.inputs {
            count += script::count_sigops(&input.script_sig, false);
        }
        for output in &self.outputs {
            count += script::count_sigops(&output.script_pubkey, false);
        }
        count
    }
}
