//! The block assembler: greedy, single-pass template construction.

use crate::config::AssemblyConfig;
use crate::domain::candidates::{allow_free, extract_candidates, Candidate};
use crate::domain::coinbase::{CoinbaseBuilder, RewardAddress};
use crate::domain::dependencies::DependencyTracker;
use crate::domain::invariants;
use crate::domain::queue::{OrderingMode, SelectionQueue};
use crate::domain::template::BlockTemplate;
use crate::domain::turnstile::TurnstileGuard;
use crate::error::Result;
use crate::ports::{LedgerView, PendingPool, ProofService};
use quarry_types::script::count_p2sh_sigops;
use quarry_types::{short_hash, Amount, Block, BlockHeader, TipInfo, Transaction};
use tracing::{debug, info, warn};

/// Assembles block templates against a working ledger view.
///
/// The assembler is stateless across builds; every call to
/// [`BlockAssembler::assemble`] starts from the tip snapshot it is
/// given. Callers must hold the ledger-wide lock for the duration of a
/// build: partial greedy state (running balances, dependency
/// resolution) is not safe to interleave with pool or ledger mutation.
pub struct BlockAssembler {
    config: AssemblyConfig,
}

impl BlockAssembler {
    /// Creates an assembler; the configuration is sanitized on the way
    /// in.
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    /// The sanitized configuration in effect.
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Builds a template on top of `tip`.
    ///
    /// `now` is the wall-clock time used for the header timestamp; the
    /// selected transaction set is fully determined by the tip, the pool
    /// snapshot, and the configuration.
    #[tracing::instrument(skip_all, fields(height = tip.next_height()))]
    pub fn assemble(
        &self,
        view: &mut dyn LedgerView,
        pool: &dyn PendingPool,
        proofs: &dyn ProofService,
        tip: &TipInfo,
        reward_address: &RewardAddress,
        now: u64,
    ) -> Result<BlockTemplate> {
        let config = &self.config;
        let height = tip.next_height();

        let extraction = extract_candidates(view, pool, tip)?;
        info!(
            ready = extraction.ready.len(),
            blocked = extraction.blocked.len(),
            "evaluating transactions for inclusion"
        );

        let mut tracker = DependencyTracker::from_records(extraction.blocked);
        let initial_mode = if config.priority_size > 0 {
            OrderingMode::Priority
        } else {
            OrderingMode::Fee
        };
        let mut queue = SelectionQueue::new(initial_mode, extraction.ready);
        let mut guard = TurnstileGuard::from_tip(tip);

        let mut block_size = crate::COINBASE_RESERVED_SIZE;
        let mut block_sigops = crate::COINBASE_RESERVED_SIGOPS;
        let mut total_fees: Amount = 0;
        let mut transactions: Vec<Transaction> = Vec::new();
        let mut tx_fees: Vec<Amount> = Vec::new();
        let mut tx_sigops: Vec<u32> = Vec::new();

        while let Some(candidate) = queue.pop() {
            let Candidate {
                tx,
                txid,
                priority,
                fee_rate,
                fee_paid,
                size,
            } = candidate;
            let short = short_hash(&txid);

            if block_size + size >= config.max_block_size {
                debug!(txid = %short, size, "skipping: would exceed maximum block size");
                continue;
            }

            let legacy_sigops = tx.legacy_sigops();
            if block_sigops + legacy_sigops >= config.max_sigops {
                debug!(txid = %short, legacy_sigops, "skipping: would exceed legacy sigop bound");
                continue;
            }

            // Skip free transactions once past the minimum block size,
            // unless an operator override vouches for them.
            if queue.mode() == OrderingMode::Fee {
                let mut priority_delta = 0f64;
                let mut fee_delta: Amount = 0;
                pool.apply_deltas(&txid, &mut priority_delta, &mut fee_delta);
                if priority_delta <= 0.0
                    && fee_delta <= 0
                    && fee_rate < config.min_relay_fee_rate
                    && fee_paid < config.conventional_fee
                    && block_size + size >= config.min_block_size
                {
                    debug!(
                        txid = %short,
                        fee = fee_paid,
                        %fee_rate,
                        "skipping free transaction: minimum block size reached"
                    );
                    continue;
                }
            }

            // Prioritise by fee once the reserved priority space fills
            // or the remaining candidates are no longer high-priority.
            if queue.mode() == OrderingMode::Priority
                && (block_size + size >= config.priority_size || !allow_free(priority))
            {
                debug!(
                    block_size,
                    "priority space filled; switching to fee ordering"
                );
                queue.switch_to_fee_ordering();
            }

            // Inputs can go missing when an earlier dependency was
            // itself skipped; that is an ordinary skip, not corruption.
            if !view.have_inputs(&tx) {
                debug!(txid = %short, "skipping: missing inputs");
                continue;
            }
            let value_in = view
                .value_in(&tx)
                .expect("inputs verified by have_inputs")
                + tx.shielded_value_in();
            let tx_fee = value_in - tx.value_out();

            let mut sigops = legacy_sigops;
            for input in &tx.inputs {
                let spent = view
                    .spendable_output(&input.prevout)
                    .expect("inputs verified by have_inputs");
                sigops += count_p2sh_sigops(&spent.script_pubkey, &input.script_sig);
            }
            if block_sigops + sigops >= config.max_sigops {
                debug!(txid = %short, sigops, "skipping: would exceed nested sigop bound");
                continue;
            }

            if let Err(reason) = view.contextual_check(&tx, height) {
                warn!(txid = %short, %reason, "skipping: failed contextual check");
                continue;
            }

            if let Err(pool_kind) = guard.admit(&tx) {
                warn!(txid = %short, pool = %pool_kind, "skipping: turnstile violation");
                continue;
            }

            view.apply_transaction(&tx, height);
            block_size += size;
            block_sigops += sigops;
            total_fees += tx_fee;
            if config.print_priority {
                info!(txid = %short, priority, %fee_rate, "accepted candidate");
            }
            tx_fees.push(tx_fee);
            tx_sigops.push(sigops);
            transactions.push(tx);

            for promoted in tracker.on_included(&txid) {
                queue.push(promoted);
            }
        }

        info!(
            transactions = transactions.len(),
            size = block_size,
            fees = total_fees,
            blocked_remaining = tracker.blocked_count(),
            "selection finished"
        );

        let coinbase =
            CoinbaseBuilder::new(height, total_fees, &config.reward, proofs).build(reward_address)?;
        let coinbase_sigops = coinbase.legacy_sigops();
        transactions.insert(0, coinbase);
        tx_fees.insert(0, -total_fees);
        tx_sigops.insert(0, coinbase_sigops);

        let chain_history_root = view.history_root();
        let header = BlockHeader {
            version: 4,
            prev_hash: tip.hash,
            merkle_root: [0u8; 32],
            block_commitments: [0u8; 32],
            time: now.max(tip.median_time_past + 1),
            bits: tip.next_bits,
            nonce: [0u8; 32],
            solution: Vec::new(),
        };

        let mut template = BlockTemplate {
            block: Block {
                header,
                transactions,
            },
            tx_fees,
            tx_sigops,
            height,
            total_size: block_size,
            total_fees,
            chain_history_root,
            auth_data_root: [0u8; 32],
        };
        template.refresh_commitments();

        invariants::validate_template(&template, config)?;
        Ok(template)
    }
}
