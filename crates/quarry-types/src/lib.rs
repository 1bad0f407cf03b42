//! # Quarry Chain Primitives
//!
//! Shared domain types for the block assembly and mining crates:
//!
//! - **Money**: [`Amount`] (signed zatoshi), [`FeeRate`] (fee per 1000
//!   bytes with a deterministic total order).
//! - **Transactions**: the UTXO transaction model with shielded parts:
//!   transparent inputs/outputs, legacy sprout transfer pairs, and
//!   sapling/orchard bundle summaries with their value balances.
//! - **Blocks**: header, merkle root, authorizing-data root, and the
//!   derived block-commitments hash.
//! - **Value pools**: per-pool running balances used by the turnstile
//!   check during template assembly.
//! - **Chain views**: [`TipInfo`], the snapshot of the parent chain tip a
//!   template build works from.
//!
//! These types carry no policy: selection rules, limits, and the reward
//! schedule live in `quarry-assembly`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Money amounts and fee rates.
pub mod amount;
/// Block and header types, merkle/commitment roots.
pub mod block;
/// Chain tip snapshot consumed by template builds.
pub mod chain;
/// Value-pool identifiers and balance accumulators.
pub mod pools;
/// Script opcode scanning (signature-operation counting).
pub mod script;
/// Transaction model.
pub mod transaction;

pub use amount::{Amount, FeeRate, COIN, MAX_MONEY};
pub use block::{derive_block_commitments, Block, BlockHeader};
pub use chain::TipInfo;
pub use pools::{ChainValueBalances, PoolBalances, ValuePool};
pub use transaction::{
    OutPoint, OutputDescription, SproutTransfer, Transaction, TxIn, TxOut,
};

/// A 32-byte hash (SHA-256d).
pub type Hash = [u8; 32];

/// A transaction identifier.
pub type TxId = Hash;

/// Renders the first bytes of a hash for log output.
pub fn short_hash(hash: &Hash) -> String {
    hex::encode(&hash[..8])
}

/// SHA-256d (double SHA-256), the hash used for txids, headers, and
/// merkle nodes.
pub fn sha256d(data: &[u8]) -> Hash {
    use sha2::{Digest, Sha256};
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}
