//! Worker-pool lifecycle.

use crate::cancel::CancelToken;
use crate::config::MiningConfig;
use crate::error::Result;
use crate::ports::{BlockSubmitter, PowSolver, TemplateSource};
use crate::worker::{run_worker, WorkerContext};
use quarry_assembly::RewardAddress;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};

/// Explicitly owned handle over the mining worker threads.
///
/// Created and destroyed by the orchestrating layer; the workers
/// themselves are stateless across builds. Dropping the handle without
/// [`MinerPool::shutdown`] detaches the threads, so orchestrators
/// should shut down explicitly.
pub struct MinerPool {
    workers: Vec<JoinHandle<Result<()>>>,
    cancel: Arc<CancelToken>,
    shutdown: Arc<AtomicBool>,
}

impl MinerPool {
    /// Spawns `config.workers` independent mining workers.
    pub fn spawn(
        config: MiningConfig,
        source: Arc<dyn TemplateSource>,
        solver: Arc<dyn PowSolver>,
        submitter: Arc<dyn BlockSubmitter>,
        reward_address: Option<RewardAddress>,
    ) -> Self {
        let cancel = Arc::new(CancelToken::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let count = config.workers.max(1);

        info!(workers = count, solver = solver.name(), "starting miner pool");

        let workers = (0..count)
            .map(|index| {
                let ctx = WorkerContext {
                    source: Arc::clone(&source),
                    solver: Arc::clone(&solver),
                    submitter: Arc::clone(&submitter),
                    cancel: Arc::clone(&cancel),
                    shutdown: Arc::clone(&shutdown),
                    reward_address: reward_address.clone(),
                    config: config.clone(),
                };
                std::thread::Builder::new()
                    .name(format!("quarry-miner-{index}"))
                    .spawn(move || {
                        let outcome = run_worker(ctx);
                        if let Err(err) = &outcome {
                            error!(worker = index, %err, "mining worker terminated");
                        }
                        outcome
                    })
                    .expect("failed to spawn mining worker thread")
            })
            .collect();

        Self {
            workers,
            cancel,
            shutdown,
        }
    }

    /// The shared cancellation token, for wiring into tip-change
    /// notifications.
    pub fn cancel_token(&self) -> Arc<CancelToken> {
        Arc::clone(&self.cancel)
    }

    /// Reacts to an externally observed chain-tip change: in-progress
    /// searches unwind cooperatively and rebuild on the new tip.
    pub fn notify_tip_changed(&self) {
        self.cancel.set();
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops all workers and joins them, returning each worker's exit
    /// status.
    pub fn shutdown(self) -> Vec<Result<()>> {
        info!("stopping miner pool");
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake any worker parked inside the solver.
        self.cancel.set();
        self.workers
            .into_iter()
            .map(|handle| handle.join().expect("mining worker thread panicked"))
            .collect()
    }
}
