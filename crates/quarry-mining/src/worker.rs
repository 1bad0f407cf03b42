//! The mining worker loop.

use crate::cancel::CancelToken;
use crate::config::MiningConfig;
use crate::error::{MiningError, Result};
use crate::job::{increment_nonce, subspace_exhausted, update_time, MiningJob};
use crate::ports::{BlockSubmitter, PowSolver, SubmitOutcome, TemplateSource};
use quarry_assembly::RewardAddress;
use quarry_types::{short_hash, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Everything one worker needs. Each worker owns its own jobs and
/// search state; the cancel token and shutdown flag are shared across
/// the pool.
#[derive(Clone)]
pub struct WorkerContext {
    /// Produces tips and templates under the ledger lock.
    pub source: Arc<dyn TemplateSource>,
    /// The external search primitive.
    pub solver: Arc<dyn PowSolver>,
    /// Submits solved blocks.
    pub submitter: Arc<dyn BlockSubmitter>,
    /// Shared cancellation flag set on tip changes.
    pub cancel: Arc<CancelToken>,
    /// Pool-wide shutdown flag.
    pub shutdown: Arc<AtomicBool>,
    /// Reward address for built templates, if one is configured.
    pub reward_address: Option<RewardAddress>,
    /// Loop tuning.
    pub config: MiningConfig,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Runs the build/search loop until shutdown.
///
/// Terminates with an error only on unrecoverable conditions: a missing
/// reward address, a chain-source failure, or a build-fatal assembly
/// error. Stale jobs, cancellations, and racing submissions all loop
/// back into a fresh build.
pub fn run_worker(ctx: WorkerContext) -> Result<()> {
    let reward_address = ctx
        .reward_address
        .clone()
        .ok_or(MiningError::NoRewardAddress)?;

    info!(solver = ctx.solver.name(), tag = %ctx.config.solver_tag, "mining worker started");

    let mut rng = rand::thread_rng();
    let stale_timeout = Duration::from_secs(ctx.config.stale_timeout_secs);
    let retry_delay = Duration::from_millis(ctx.config.retry_delay_ms);

    // Per-worker extra-nonce counter; resets when the parent changes.
    let mut extra_nonce: u32 = 0;
    let mut last_parent: Hash = [0u8; 32];

    'build: while !ctx.shutdown.load(Ordering::Relaxed) {
        let pool_counter = ctx.source.pool_updates_counter();
        let Some(tip) = ctx.source.tip()? else {
            // No tip to build on yet; wait and retry.
            std::thread::sleep(retry_delay);
            continue 'build;
        };

        let mut job = MiningJob::new(ctx.source.create_template(&reward_address)?);

        if tip.hash != last_parent {
            extra_nonce = 0;
            last_parent = tip.hash;
        }
        extra_nonce += 1;
        job.template.apply_extra_nonce(extra_nonce);

        info!(
            height = job.template.height,
            transactions = job.template.block.transactions.len(),
            size = job.template.total_size,
            "searching new template"
        );

        let search_started = Instant::now();
        job.randomize_nonce(&mut rng);

        loop {
            if ctx.shutdown.load(Ordering::Relaxed) {
                break 'build;
            }

            let cancel = Arc::clone(&ctx.cancel);
            let cancelled = move || cancel.is_set();
            let header_input = job.header().solver_input();
            let nonce = job.header().nonce;
            let solutions = ctx.solver.solve(&header_input, &nonce, &cancelled);

            for solution in solutions {
                if !job.check_solution(solution) {
                    // A solution the solver liked but the target does
                    // not: keep searching rather than failing.
                    debug!("candidate solution failed target re-check");
                    continue;
                }

                let hash = job.header().hash();
                info!(hash = %short_hash(&hash), "proof-of-work found");
                match ctx.submitter.submit(&job.template.block) {
                    SubmitOutcome::Accepted => {
                        info!(hash = %short_hash(&hash), height = job.template.height, "block accepted");
                        // The tip change this triggers is our own; do
                        // not let it cancel the next search.
                        ctx.cancel.acknowledge();
                        continue 'build;
                    }
                    SubmitOutcome::StaleTip => {
                        warn!("solved block lost the race to another tip; discarding");
                        continue 'build;
                    }
                    SubmitOutcome::Rejected => {
                        warn!("solved block rejected by validation; rebuilding");
                        continue 'build;
                    }
                }
            }

            // Solver returned without an acceptable solution: decide
            // whether this job is still worth searching.
            if ctx.cancel.is_set() {
                ctx.cancel.acknowledge();
                debug!("search cancelled: chain tip changed elsewhere");
                continue 'build;
            }
            if subspace_exhausted(&job.header().nonce) {
                debug!("nonce sub-space exhausted");
                continue 'build;
            }
            match ctx.source.tip()? {
                Some(current) if current.hash == tip.hash => {}
                _ => {
                    debug!("chain tip moved under the search");
                    continue 'build;
                }
            }
            if ctx.source.pool_updates_counter() != pool_counter
                && search_started.elapsed() >= stale_timeout
            {
                debug!("pending pool changed and staleness timeout elapsed");
                continue 'build;
            }

            increment_nonce(&mut job.header_mut().nonce);
            update_time(job.header_mut(), &tip, unix_now());
        }
    }

    info!("mining worker stopped");
    Ok(())
}
