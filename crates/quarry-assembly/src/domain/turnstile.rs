//! Turnstile accounting: per-pool value conservation during selection.

use quarry_types::pools::{pool_delta, ALL_POOLS};
use quarry_types::{PoolBalances, TipInfo, Transaction, ValuePool};
use tracing::warn;

/// Tracks running per-pool balances and rejects any candidate whose
/// inclusion would drive a pool negative.
///
/// Balances reset per template build from the parent tip's recorded
/// values. If any ancestor value is unknown the guard runs unmonitored
/// and accepts everything.
#[derive(Clone, Debug)]
pub struct TurnstileGuard {
    balances: Option<PoolBalances>,
}

impl TurnstileGuard {
    /// Initializes the guard from the parent tip's recorded balances.
    pub fn from_tip(tip: &TipInfo) -> Self {
        let balances = tip.chain_value_balances.complete();
        if balances.is_none() {
            warn!(
                height = tip.next_height(),
                "ancestor pool balances unknown; turnstile not monitored for this build"
            );
        }
        Self { balances }
    }

    /// A guard with explicit starting balances (monitored).
    pub fn with_balances(balances: PoolBalances) -> Self {
        Self {
            balances: Some(balances),
        }
    }

    /// Whether the guard is enforcing the invariant.
    pub fn monitored(&self) -> bool {
        self.balances.is_some()
    }

    /// Current balances, when monitored.
    pub fn balances(&self) -> Option<&PoolBalances> {
        self.balances.as_ref()
    }

    /// Applies `tx`'s per-pool deltas hypothetically; commits and
    /// accepts only if every pool stays non-negative. On rejection the
    /// balances are untouched and the violated pool is returned.
    pub fn admit(&mut self, tx: &Transaction) -> Result<(), ValuePool> {
        let Some(balances) = self.balances.as_mut() else {
            return Ok(());
        };

        let mut hypothetical = *balances;
        for pool in ALL_POOLS {
            hypothetical.add(pool, pool_delta(tx, pool));
        }
        for pool in ALL_POOLS {
            if hypothetical.get(pool) < 0 {
                return Err(pool);
            }
        }
        *balances = hypothetical;
        Ok(())
    }
}
