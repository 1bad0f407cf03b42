//! Configuration for the mining loop.

use serde::Deserialize;

/// Runtime configuration for the miner.
#[derive(Clone, Debug, Deserialize)]
pub struct MiningConfig {
    /// Number of independent mining workers.
    pub workers: usize,

    /// Which external solver implementation the orchestrator wired in;
    /// carried for logging and diagnostics.
    pub solver_tag: String,

    /// Seconds without a tip change after which a mempool update forces
    /// a rebuild.
    pub stale_timeout_secs: u64,

    /// Milliseconds to wait before retrying when no chain tip is
    /// available.
    pub retry_delay_ms: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            solver_tag: "default".to_string(),
            stale_timeout_secs: crate::DEFAULT_STALE_TIMEOUT_SECS,
            retry_delay_ms: crate::DEFAULT_RETRY_DELAY_MS,
        }
    }
}
