//! Configuration for template assembly.

use quarry_types::{Amount, FeeRate, COIN};
use serde::Deserialize;
use serde_with::{serde_as, Bytes};

/// Runtime configuration for the block assembler.
#[derive(Clone, Debug, Deserialize)]
pub struct AssemblyConfig {
    /// Largest block the assembler is willing to create.
    pub max_block_size: usize,

    /// Share of the block dedicated to high-priority transactions,
    /// included regardless of the fees they pay. Zero starts selection
    /// directly in fee ordering.
    pub priority_size: usize,

    /// The block is filled with free transactions until it reaches this
    /// size; past it, low-fee low-priority candidates are skipped.
    pub min_block_size: usize,

    /// Maximum signature operations per block (legacy and nested counts
    /// both checked against this).
    pub max_sigops: u32,

    /// Fee rate below which a transaction counts as "free" for the
    /// minimum-size floor.
    pub min_relay_fee_rate: FeeRate,

    /// Absolute fee below which a transaction counts as "free" for the
    /// minimum-size floor.
    pub conventional_fee: Amount,

    /// Log every accepted candidate's priority and fee rate.
    pub print_priority: bool,

    /// Reward schedule for the coinbase builder.
    pub reward: RewardScheduleConfig,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_block_size: crate::DEFAULT_MAX_BLOCK_SIZE,
            priority_size: crate::DEFAULT_BLOCK_PRIORITY_SIZE,
            min_block_size: crate::DEFAULT_BLOCK_MIN_SIZE,
            max_sigops: crate::MAX_BLOCK_SIGOPS,
            min_relay_fee_rate: FeeRate::from_zats_per_kb(100),
            conventional_fee: 10_000,
            print_priority: false,
            reward: RewardScheduleConfig::default(),
        }
    }
}

impl AssemblyConfig {
    /// Clamps out-of-range values into their legal ranges instead of
    /// erroring: block size to `[1000, ABSOLUTE_MAX - 1000]`, priority
    /// and minimum sizes to at most the block size.
    pub fn sanitized(mut self) -> Self {
        self.max_block_size = self
            .max_block_size
            .clamp(1000, crate::ABSOLUTE_MAX_BLOCK_SIZE - 1000);
        self.priority_size = self.priority_size.min(self.max_block_size);
        self.min_block_size = self.min_block_size.min(self.max_block_size);
        self
    }
}

/// Recipient of a funding stream share.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum StreamRecipient {
    /// A transparent script.
    Transparent {
        /// Locking script paid by the stream output.
        script_pubkey: Vec<u8>,
    },
    /// A shielded payment address; outputs go through the proof service
    /// and debit the sapling value balance.
    Shielded {
        /// Raw payment-address bytes.
        #[serde_as(as = "Bytes")]
        recipient: [u8; 43],
    },
}

/// One funding stream: a fraction of the block subsidy paid to a fixed
/// recipient over a height range.
#[derive(Clone, Debug, Deserialize)]
pub struct FundingStream {
    /// Who receives the share.
    pub recipient: StreamRecipient,
    /// Share numerator.
    pub numerator: u64,
    /// Share denominator.
    pub denominator: u64,
    /// First height (inclusive) the stream is active.
    pub start_height: u32,
    /// First height (exclusive) the stream is no longer active.
    pub end_height: u32,
}

impl FundingStream {
    /// Whether the stream is active at `height`.
    pub fn active_at(&self, height: u32) -> bool {
        height >= self.start_height && height < self.end_height
    }

    /// This stream's share of `subsidy`.
    pub fn value(&self, subsidy: Amount) -> Amount {
        debug_assert!(self.denominator > 0);
        (subsidy as i128 * self.numerator as i128 / self.denominator as i128) as Amount
    }
}

/// Block-reward schedule: halving subsidy, the pre-activation founders
/// share, and the post-activation funding streams.
#[derive(Clone, Debug, Deserialize)]
pub struct RewardScheduleConfig {
    /// Subsidy before any halving.
    pub base_subsidy: Amount,

    /// Blocks between subsidy halvings.
    pub halving_interval: u32,

    /// Last height (inclusive) at which the founders share is paid.
    pub last_founders_height: u32,

    /// Rotation of founders reward scripts, indexed by height.
    pub founders_scripts: Vec<Vec<u8>>,

    /// Height at which structured funding streams replace the founders
    /// share.
    pub funding_activation_height: u32,

    /// Configured funding streams.
    pub funding_streams: Vec<FundingStream>,
}

impl Default for RewardScheduleConfig {
    fn default() -> Self {
        Self {
            base_subsidy: 125 * COIN / 10,
            halving_interval: 840_000,
            last_founders_height: 0,
            founders_scripts: Vec::new(),
            funding_activation_height: u32::MAX,
            funding_streams: Vec::new(),
        }
    }
}

impl RewardScheduleConfig {
    /// The founders script for `height`, rotated evenly over the
    /// founders window. `None` when no scripts are configured.
    pub fn founders_script_at(&self, height: u32) -> Option<&[u8]> {
        if self.founders_scripts.is_empty() || self.last_founders_height == 0 {
            return None;
        }
        let span = self.last_founders_height as u64 + 1;
        let index = height as u64 * self.founders_scripts.len() as u64 / span;
        self.founders_scripts
            .get(index as usize)
            .map(Vec::as_slice)
    }
}
