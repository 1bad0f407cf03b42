//! Hexagonal architecture interfaces for the assembly engine.

mod outbound;

pub use outbound::{LedgerView, PendingPool, ProofFailure, ProofService, SpentOutput};
