//! # Quarry Block-Template Assembly Engine
//!
//! Builds block templates from a pending-transaction pool: selects a
//! consistent, size/sigop-bounded, fee/priority-ordered subset of
//! candidates, constructs the reward (coinbase) transaction, and hands a
//! finished [`BlockTemplate`] to the mining loop.
//!
//! ## Selection pipeline
//!
//! ```text
//! PendingPool snapshot
//!        │
//!        ▼
//! CandidateExtraction ──► DependencyTracker (blocked candidates)
//!        │                        ▲      │ promote on inclusion
//!        ▼                        │      ▼
//! SelectionQueue (priority-first, then fee-first)
//!        │ pop best
//!        ▼
//! BlockAssembler checks: size → sigops → free floor → inputs →
//! nested sigops → contextual validity → TurnstileGuard
//!        │ accept
//!        ▼
//! working LedgerView updated, totals accumulated
//!        │ queue empty
//!        ▼
//! CoinbaseBuilder ──► commitment roots ──► BlockTemplate
//! ```
//!
//! ## Critical invariants
//!
//! 1. **Size bound**: template size never reaches the configured maximum.
//! 2. **Sigop bound**: legacy + nested sigops never reach the maximum.
//! 3. **Topological order**: a transaction spending a pending output
//!    appears strictly after its producer.
//! 4. **Turnstile**: no shielded value pool goes negative (when the
//!    ancestor balances are known).
//! 5. **Reward conservation**: the coinbase mints exactly
//!    `subsidy(height) + fees`.
//!
//! Selection is greedy, single-pass, and non-backtracking: a rejected
//! candidate is dropped from the template but never removed from the
//! external pool.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Pure assembly logic: candidates, queue, turnstile, coinbase,
/// assembler, invariants.
pub mod domain;
/// Outbound interfaces to the ledger, pool, and proof collaborators.
pub mod ports;

mod config;
mod error;

pub use config::{AssemblyConfig, FundingStream, RewardScheduleConfig, StreamRecipient};
pub use error::{AssemblyError, Result};

pub use domain::{
    allow_free, block_subsidy, BlockAssembler, BlockTemplate, Candidate, CoinbaseBuilder,
    DependencyTracker, OrderingMode, PendingRecord, RewardAddress, SelectionQueue,
    TurnstileGuard,
};
pub use ports::{LedgerView, PendingPool, ProofFailure, ProofService, SpentOutput};

/// Hard upper bound on serialized block size.
pub const ABSOLUTE_MAX_BLOCK_SIZE: usize = 2_000_000;

/// Default maximum template size.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = ABSOLUTE_MAX_BLOCK_SIZE;

/// Maximum signature operations per block.
pub const MAX_BLOCK_SIGOPS: u32 = 20_000;

/// Default share of the block reserved for high-priority transactions,
/// included regardless of the fees they pay.
pub const DEFAULT_BLOCK_PRIORITY_SIZE: usize = 1_000_000;

/// Default minimum block size; below it free transactions are admitted.
pub const DEFAULT_BLOCK_MIN_SIZE: usize = 0;

/// Size reserved up front for the coinbase transaction.
pub const COINBASE_RESERVED_SIZE: usize = 1000;

/// Sigops reserved up front for the coinbase transaction.
pub const COINBASE_RESERVED_SIGOPS: u32 = 100;
