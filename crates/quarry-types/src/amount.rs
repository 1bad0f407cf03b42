//! Money amounts and fee rates.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A monetary amount in zatoshi. Signed: value balances and pool deltas
/// are negative when value flows into a shielded pool.
pub type Amount = i64;

/// Number of zatoshi in one coin.
pub const COIN: Amount = 100_000_000;

/// Absolute bound on any single monetary value on the chain.
pub const MAX_MONEY: Amount = 21_000_000 * COIN;

/// Checks that a value lies inside the representable money range.
pub fn money_range(value: Amount) -> bool {
    (0..=MAX_MONEY).contains(&value)
}

/// Fee per 1000 bytes of serialized transaction.
///
/// Ordering is total and deterministic: higher rate first is up to the
/// caller; `FeeRate` itself orders ascending like any integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRate {
    zats_per_kb: Amount,
}

impl FeeRate {
    /// A zero fee rate.
    pub const ZERO: FeeRate = FeeRate { zats_per_kb: 0 };

    /// Creates a fee rate directly from a per-1000-byte figure.
    pub fn from_zats_per_kb(zats_per_kb: Amount) -> Self {
        Self { zats_per_kb }
    }

    /// Computes the rate paid by `fee` zatoshi on a transaction of
    /// `size` bytes. A zero size yields a zero rate.
    pub fn new(fee: Amount, size: usize) -> Self {
        if size == 0 {
            return Self::ZERO;
        }
        Self {
            zats_per_kb: fee.saturating_mul(1000) / size as Amount,
        }
    }

    /// The fee this rate implies for a transaction of `size` bytes.
    pub fn fee_for(&self, size: usize) -> Amount {
        let fee = self.zats_per_kb.saturating_mul(size as Amount) / 1000;
        if fee == 0 && self.zats_per_kb > 0 {
            // Round up: a positive rate never charges nothing.
            self.zats_per_kb
        } else {
            fee
        }
    }

    /// Raw per-1000-byte figure.
    pub fn zats_per_kb(&self) -> Amount {
        self.zats_per_kb
    }
}

impl Ord for FeeRate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.zats_per_kb.cmp(&other.zats_per_kb)
    }
}

impl PartialOrd for FeeRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} zat/kB", self.zats_per_kb)
    }
}
