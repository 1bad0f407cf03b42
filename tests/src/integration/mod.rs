//! Cross-crate integration scenarios.

mod mining_loop;
mod selection;
