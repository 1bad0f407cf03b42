//! Mining jobs: the header fields under active search.

use primitive_types::U256;
use quarry_assembly::BlockTemplate;
use quarry_types::{BlockHeader, Hash, TipInfo};
use rand::Rng;

/// Upper bound on how far a header timestamp may run ahead of the
/// parent's median time past.
pub const MAX_FUTURE_BLOCK_TIME: u64 = 90 * 60;

/// Expands a compact difficulty encoding into the full 256-bit target.
/// Returns zero for negative encodings (nothing can meet them).
pub fn expand_compact_target(bits: u32) -> U256 {
    let exponent = (bits >> 24) as i32;
    let mantissa = bits & 0x007f_ffff;
    if mantissa == 0 || bits & 0x0080_0000 != 0 {
        return U256::zero();
    }
    if exponent <= 3 {
        U256::from(mantissa >> (8 * (3 - exponent) as u32))
    } else {
        let shift = 8 * (exponent - 3) as usize;
        if shift > 232 {
            // The mantissa would shift past 256 bits.
            return U256::MAX;
        }
        U256::from(mantissa) << shift
    }
}

/// Interprets a block hash as a big-endian 256-bit integer for target
/// comparison.
pub fn hash_to_u256(hash: &Hash) -> U256 {
    U256::from_big_endian(hash)
}

/// A fresh random starting nonce with the top and bottom 16 bits
/// cleared for local use as counters.
pub fn random_search_nonce(rng: &mut impl Rng) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes[..]);
    let nonce = (U256::from_big_endian(&bytes) << 32) >> 16;
    nonce.to_big_endian(&mut bytes);
    bytes
}

/// Whether the bounded per-job nonce sub-space is exhausted: the low 16
/// bits are all ones.
pub fn subspace_exhausted(nonce: &[u8; 32]) -> bool {
    nonce[30] == 0xff && nonce[31] == 0xff
}

/// Advances the nonce by one, wrapping at 2^256.
pub fn increment_nonce(nonce: &mut [u8; 32]) {
    let (next, _) = U256::from_big_endian(nonce).overflowing_add(U256::one());
    next.to_big_endian(nonce);
}

/// Refreshes the header timestamp: at least one past the parent's
/// median time, at most [`MAX_FUTURE_BLOCK_TIME`] beyond it.
pub fn update_time(header: &mut BlockHeader, tip: &TipInfo, now: u64) {
    let floor = tip.median_time_past + 1;
    header.time = now.max(floor).min(tip.median_time_past + MAX_FUTURE_BLOCK_TIME);
}

/// One search job: a template plus the expanded target. Owned by
/// exactly one worker iteration and discarded on staleness.
#[derive(Clone, Debug)]
pub struct MiningJob {
    /// The template under search.
    pub template: BlockTemplate,
    /// Expanded difficulty target the header hash must not exceed.
    pub target: U256,
}

impl MiningJob {
    /// Creates a job, expanding the template's compact difficulty.
    pub fn new(template: BlockTemplate) -> Self {
        let target = expand_compact_target(template.block.header.bits);
        Self { template, target }
    }

    /// The header under search.
    pub fn header(&self) -> &BlockHeader {
        &self.template.block.header
    }

    /// Mutable access to the header under search.
    pub fn header_mut(&mut self) -> &mut BlockHeader {
        &mut self.template.block.header
    }

    /// Picks a fresh random starting nonce.
    pub fn randomize_nonce(&mut self, rng: &mut impl Rng) {
        self.header_mut().nonce = random_search_nonce(rng);
    }

    /// Installs a candidate solution and re-validates it by recomputing
    /// the header hash against the target.
    pub fn check_solution(&mut self, solution: Vec<u8>) -> bool {
        self.header_mut().solution = solution;
        hash_to_u256(&self.header().hash()) <= self.target
    }
}
