//! Error types for the mining loop.
//!
//! Stale templates and racing submissions are not errors; the loop
//! handles them by rebuilding. Errors here terminate the worker.

use crate::ports::SourceFailure;
use quarry_assembly::AssemblyError;
use thiserror::Error;

/// Result type alias for mining operations.
pub type Result<T> = std::result::Result<T, MiningError>;

/// Errors that terminate a mining worker.
#[derive(Debug, Error)]
pub enum MiningError {
    /// No valid reward address was configured for this worker.
    #[error("no valid reward address configured")]
    NoRewardAddress,

    /// The chain source failed outright (as opposed to having no tip
    /// yet, which is wait-and-retry).
    #[error("chain source failure: {0}")]
    Source(#[from] SourceFailure),

    /// Template assembly failed: proof-service failure, pool-integrity
    /// violation, or an invalid template.
    #[error("template assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}
