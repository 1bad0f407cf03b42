//! # Quarry Mining Loop
//!
//! Drives the proof-of-work search against templates produced by
//! `quarry-assembly`. Each worker owns one [`MiningJob`] at a time and
//! runs the loop:
//!
//! ```text
//! Idle → BuildingTemplate → Searching → {SolutionFound | Stale | Cancelled}
//!            ▲                                   │
//!            └───────────────────────────────────┘
//! ```
//!
//! - **BuildingTemplate**: ask the [`TemplateSource`] for the tip and a
//!   fresh template; wait and retry when no tip exists yet.
//! - **Searching**: run the external [`PowSolver`] over a bounded nonce
//!   sub-space from a random starting nonce, feeding it a cancellation
//!   predicate.
//! - **Stale**: the tip moved, the sub-space ran out, or the pool
//!   changed and the staleness timeout elapsed; discard the job and
//!   rebuild.
//! - **Cancelled**: a tip-change notification set the shared
//!   [`CancelToken`]; the solver unwinds cooperatively and the loop
//!   rebuilds.
//! - **SolutionFound**: every candidate solution is re-validated against
//!   the target before submission; a failing one is treated as stale,
//!   never fatal. A submission racing another block is discarded, not an
//!   error.
//!
//! Workers are plain OS threads owned by a [`MinerPool`] handle; the
//! loop itself keeps no state across builds.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cancel;
mod config;
mod error;
mod job;
/// Interfaces to the solver, submitter, and template source.
pub mod ports;
mod pool;
mod worker;

pub use cancel::CancelToken;
pub use config::MiningConfig;
pub use error::{MiningError, Result};
pub use job::{
    expand_compact_target, hash_to_u256, increment_nonce, random_search_nonce,
    subspace_exhausted, update_time, MiningJob, MAX_FUTURE_BLOCK_TIME,
};
pub use pool::MinerPool;
pub use ports::{BlockSubmitter, PowSolver, SourceFailure, SubmitOutcome, TemplateSource};
pub use worker::{run_worker, WorkerContext};

/// Default seconds without a tip change before a pool update forces a
/// template rebuild.
pub const DEFAULT_STALE_TIMEOUT_SECS: u64 = 60;

/// Default wait between retries when no chain tip is available.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Width of the per-job nonce sub-space in bits.
pub const NONCE_SUBSPACE_BITS: u32 = 16;
