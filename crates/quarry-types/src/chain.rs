//! Chain tip snapshot.

use crate::pools::ChainValueBalances;
use crate::Hash;
use serde::{Deserialize, Serialize};

/// Everything a template build needs to know about the parent chain tip.
/// Taken once at build start; a build never observes tip movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipInfo {
    /// Parent block hash.
    pub hash: Hash,
    /// Parent block height; the template builds at `height + 1`.
    pub height: u32,
    /// Median time of the parent's recent ancestors, the lock-time
    /// cutoff and lower bound for the new header's timestamp.
    pub median_time_past: u64,
    /// Compact difficulty target required for the child block.
    pub next_bits: u32,
    /// Recorded shielded-pool totals as of the parent, where known.
    pub chain_value_balances: ChainValueBalances,
}

impl TipInfo {
    /// Height of the block being built on top of this tip.
    pub fn next_height(&self) -> u32 {
        self.height + 1
    }
}
