//! Error types for template assembly.
//!
//! Only build-fatal conditions surface here. Per-candidate selection
//! failures (size, sigops, turnstile, contextual checks) are
//! skip-and-continue: logged and excluded from the template, never
//! returned as errors.

use crate::ports::ProofFailure;
use thiserror::Error;

/// Result type alias for assembly operations.
pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Errors that abort a template build.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A pending transaction spends an output that exists neither in the
    /// ledger nor in the pending pool. The pool is inconsistent; no
    /// template derived from it can be trusted.
    #[error(
        "pending pool integrity violation: transaction {txid} spends unknown output {missing_txid}:{missing_index}"
    )]
    PoolIntegrity {
        /// Transaction with the unresolvable input.
        txid: String,
        /// Producing txid that could not be found.
        missing_txid: String,
        /// Output index within the missing producer.
        missing_index: u32,
    },

    /// The proof service failed to produce a shielded output, bundle, or
    /// binding signature. A reward transaction cannot be partially
    /// valid, so the whole build aborts.
    #[error("proof service failure: {0}")]
    Proof(#[from] ProofFailure),

    /// The finished template failed its own invariant self-check.
    #[error("assembled template failed self-check: {reason}")]
    TemplateInvalid {
        /// Which invariant failed.
        reason: String,
    },
}
