//! Outbound ports of the mining loop.

use quarry_assembly::{AssemblyError, BlockTemplate, RewardAddress};
use quarry_types::{Block, TipInfo};
use thiserror::Error;

/// Port: the external proof-of-work search primitive.
///
/// One invocation covers one nonce: the solver returns the finite batch
/// of candidate solutions it found (possibly empty). Implementations
/// must poll `cancelled` between work units and return early, possibly
/// with a partial batch, when it reports true; no unwinding is
/// involved.
pub trait PowSolver: Send + Sync {
    /// Identifier of the wired solver implementation.
    fn name(&self) -> &str;

    /// Runs the solver over `header_input` (the header minus nonce and
    /// solution) with the given nonce.
    fn solve(&self, header_input: &[u8], nonce: &[u8; 32], cancelled: &dyn Fn() -> bool)
        -> Vec<Vec<u8>>;
}

/// Outcome of submitting a solved block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The block was accepted as the new chain tip.
    Accepted,
    /// Another block won the race; ours is stale. Not an error.
    StaleTip,
    /// The block was rejected by validation.
    Rejected,
}

/// Port: submits a solved block through the same acceptance path as
/// externally received blocks.
pub trait BlockSubmitter: Send + Sync {
    /// Validates and connects the block.
    fn submit(&self, block: &Block) -> SubmitOutcome;
}

/// A chain-source failure. Terminates the worker, unlike an absent tip
/// which is wait-and-retry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct SourceFailure {
    /// What the chain source reported.
    pub reason: String,
}

impl SourceFailure {
    /// Creates a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Port: produces tip snapshots and templates for the mining loop.
///
/// `create_template` implementations take the exclusive ledger-wide
/// lock for the full duration of the build; the mining loop never
/// observes a partially built template.
pub trait TemplateSource: Send + Sync {
    /// The current chain tip, or `None` when the chain has none yet.
    fn tip(&self) -> std::result::Result<Option<TipInfo>, SourceFailure>;

    /// Builds a template on the current tip paying `reward_address`.
    fn create_template(
        &self,
        reward_address: &RewardAddress,
    ) -> std::result::Result<BlockTemplate, AssemblyError>;

    /// The pending pool's monotonic update counter, for staleness
    /// timing.
    fn pool_updates_counter(&self) -> u64;
}
