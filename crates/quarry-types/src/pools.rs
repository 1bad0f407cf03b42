//! Value-pool accounting.
//!
//! The chain tracks three disjoint shielded value pools. Per block, no
//! pool's aggregate balance may go negative (the turnstile invariant);
//! the assembly engine enforces this while selecting transactions.

use crate::amount::Amount;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the disjoint shielded value pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuePool {
    /// Legacy sprout pool.
    Sprout,
    /// Sapling pool.
    Sapling,
    /// Orchard pool.
    Orchard,
}

impl fmt::Display for ValuePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuePool::Sprout => write!(f, "sprout"),
            ValuePool::Sapling => write!(f, "sapling"),
            ValuePool::Orchard => write!(f, "orchard"),
        }
    }
}

/// All three pools, for iteration.
pub const ALL_POOLS: [ValuePool; 3] = [ValuePool::Sprout, ValuePool::Sapling, ValuePool::Orchard];

/// Running per-pool balances during a template build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBalances {
    /// Sprout pool balance.
    pub sprout: Amount,
    /// Sapling pool balance.
    pub sapling: Amount,
    /// Orchard pool balance.
    pub orchard: Amount,
}

impl PoolBalances {
    /// All-zero balances.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Balance of one pool.
    pub fn get(&self, pool: ValuePool) -> Amount {
        match pool {
            ValuePool::Sprout => self.sprout,
            ValuePool::Sapling => self.sapling,
            ValuePool::Orchard => self.orchard,
        }
    }

    /// Adds a delta to one pool.
    pub fn add(&mut self, pool: ValuePool, delta: Amount) {
        match pool {
            ValuePool::Sprout => self.sprout += delta,
            ValuePool::Sapling => self.sapling += delta,
            ValuePool::Orchard => self.orchard += delta,
        }
    }

    /// Whether every pool balance is non-negative.
    pub fn all_non_negative(&self) -> bool {
        self.sprout >= 0 && self.sapling >= 0 && self.orchard >= 0
    }
}

/// Per-pool balances as recorded on an ancestor chain tip. A `None`
/// entry means the chain's history does not cover that pool's total, in
/// which case turnstile monitoring is disabled for the build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainValueBalances {
    /// Recorded sprout total, if known.
    pub sprout: Option<Amount>,
    /// Recorded sapling total, if known.
    pub sapling: Option<Amount>,
    /// Recorded orchard total, if known.
    pub orchard: Option<Amount>,
}

impl ChainValueBalances {
    /// Collapses into concrete balances; `None` if any pool is unknown.
    pub fn complete(&self) -> Option<PoolBalances> {
        Some(PoolBalances {
            sprout: self.sprout?,
            sapling: self.sapling?,
            orchard: self.orchard?,
        })
    }
}

/// Net effect of a transaction on one pool's balance. Positive grows the
/// pool.
pub fn pool_delta(tx: &Transaction, pool: ValuePool) -> Amount {
    match pool {
        ValuePool::Sprout => tx
            .sprout_transfers
            .iter()
            .map(|t| t.vpub_old - t.vpub_new)
            .sum(),
        // A positive value balance is value leaving the pool.
        ValuePool::Sapling => -tx.sapling_value_balance,
        ValuePool::Orchard => -tx.orchard_value_balance,
    }
}
