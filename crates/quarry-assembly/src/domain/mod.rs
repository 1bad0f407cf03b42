//! Pure assembly logic. No I/O: every external effect goes through the
//! ports in [`crate::ports`].

mod assembler;
mod candidates;
mod coinbase;
mod dependencies;
/// Invariant checkers for finished templates.
pub mod invariants;
mod queue;
mod template;
mod turnstile;


pub use assembler::BlockAssembler;
pub use candidates::{
    allow_free, extract_candidates, Candidate, Extraction, FREE_PRIORITY_THRESHOLD,
};
pub use coinbase::{block_subsidy, coinbase_script_sig, CoinbaseBuilder, RewardAddress};
pub use dependencies::{DependencyTracker, PendingRecord};
pub use queue::{OrderingMode, SelectionQueue};
pub use template::BlockTemplate;
pub use turnstile::TurnstileGuard;
