//! Mining-loop scenarios: search, submission, cancellation, staleness.

use crate::harness::{
    genesis_tip, init_tracing, miner_address, p2pkh_tx, GatedSolver, TestNode, TrivialSolver,
    PERMISSIVE_BITS,
};
use quarry_assembly::AssemblyConfig;
use quarry_mining::{MinerPool, MiningConfig};
use quarry_types::{ChainValueBalances, TipInfo, COIN};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn mining_config() -> MiningConfig {
    MiningConfig {
        workers: 1,
        solver_tag: "test".into(),
        stale_timeout_secs: 60,
        retry_delay_ms: 5,
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_worker_mines_and_submits_a_block() {
    init_tracing();
    let node = Arc::new(TestNode::new(AssemblyConfig::default()));
    let pool_tx = {
        let mut state = node.state.lock().unwrap();
        let coin = state.fund(COIN, 90);
        let tx = p2pkh_tx(&[coin], &[COIN - 5_000]);
        state.pool.push(tx.clone());
        tx
    };

    let pool = MinerPool::spawn(
        mining_config(),
        node.clone(),
        Arc::new(TrivialSolver),
        node.clone(),
        Some(miner_address()),
    );

    assert!(
        wait_until(Duration::from_secs(10), || node.accepted_count() >= 1),
        "no block was mined in time"
    );
    pool.shutdown();

    let state = node.state.lock().unwrap();
    let first = &state.accepted[0];
    // Built on the tip that was current at build time.
    assert_eq!(first.header.prev_hash, genesis_tip().hash);
    // Coinbase first, then the pool transaction.
    assert!(first.transactions[0].is_coinbase());
    assert!(first
        .transactions
        .iter()
        .any(|tx| tx.txid() == pool_tx.txid()));
    // The submission advanced the tip and drained the pool.
    assert!(state.tip.unwrap().height >= 101);
    assert!(state.pool.is_empty());
    // The solution survived target re-validation before submission.
    assert!(!first.header.solution.is_empty());
    assert!(
        quarry_mining::hash_to_u256(&first.header.hash())
            <= quarry_mining::expand_compact_target(first.header.bits)
    );
}

#[test]
fn test_tip_change_abandons_in_progress_job() {
    init_tracing();
    let node = Arc::new(TestNode::new(AssemblyConfig::default()));
    {
        let mut state = node.state.lock().unwrap();
        let coin = state.fund(COIN, 90);
        let tx = p2pkh_tx(&[coin], &[COIN - 5_000]);
        state.pool.push(tx);
    }
    let solver = Arc::new(GatedSolver::new());

    let pool = MinerPool::spawn(
        mining_config(),
        node.clone(),
        solver.clone(),
        node.clone(),
        Some(miner_address()),
    );

    // Wait until the worker is searching its first job.
    assert!(wait_until(Duration::from_secs(10), || {
        solver.started.load(Ordering::SeqCst)
    }));

    // Another block arrives: new tip, cancellation notification.
    let new_tip = TipInfo {
        hash: [0xBB; 32],
        height: 101,
        median_time_past: genesis_tip().median_time_past + 1,
        next_bits: PERMISSIVE_BITS,
        chain_value_balances: ChainValueBalances::default(),
    };
    node.adopt_external_tip(new_tip);
    pool.notify_tip_changed();
    solver.gate.store(true, Ordering::SeqCst);

    assert!(
        wait_until(Duration::from_secs(10), || node.accepted_count() >= 1),
        "no block was mined on the new tip"
    );
    pool.shutdown();

    let state = node.state.lock().unwrap();
    // The first accepted block extends the new tip; nothing was ever
    // submitted against the stale one.
    assert_eq!(state.accepted[0].header.prev_hash, [0xBB; 32]);
    assert!(state
        .accepted
        .iter()
        .all(|block| block.header.prev_hash != genesis_tip().hash));
    assert_eq!(state.stale_submissions, 0);
}

#[test]
fn test_worker_waits_for_a_chain_tip() {
    init_tracing();
    let node = Arc::new(TestNode::new(AssemblyConfig::default()));
    node.state.lock().unwrap().tip = None;

    let pool = MinerPool::spawn(
        mining_config(),
        node.clone(),
        Arc::new(TrivialSolver),
        node.clone(),
        Some(miner_address()),
    );

    // With no tip the worker idles instead of erroring out.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(node.accepted_count(), 0);

    // Once a tip appears the worker picks it up.
    node.adopt_external_tip(genesis_tip());
    assert!(
        wait_until(Duration::from_secs(10), || node.accepted_count() >= 1),
        "worker did not recover once a tip appeared"
    );
    let outcomes = pool.shutdown();
    assert!(outcomes.iter().all(Result::is_ok));
}

#[test]
fn test_multiple_workers_share_cancellation() {
    init_tracing();
    let node = Arc::new(TestNode::new(AssemblyConfig::default()));

    let pool = MinerPool::spawn(
        MiningConfig {
            workers: 3,
            ..mining_config()
        },
        node.clone(),
        Arc::new(TrivialSolver),
        node.clone(),
        Some(miner_address()),
    );
    assert_eq!(pool.worker_count(), 3);

    assert!(wait_until(Duration::from_secs(10), || {
        node.accepted_count() >= 3
    }));
    let outcomes = pool.shutdown();
    assert!(outcomes.iter().all(Result::is_ok));

    // Every accepted block chains onto the one before it.
    let state = node.state.lock().unwrap();
    for pair in state.accepted.windows(2) {
        assert_eq!(pair[1].header.prev_hash, pair[0].header.hash());
    }
}
