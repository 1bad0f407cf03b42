//! Template-assembly scenarios across the selection pipeline.

use crate::harness::{init_tracing, miner_address, p2pkh_tx, NullProofs, ScratchLedger, SnapshotPool};
use quarry_assembly::domain::invariants;
use quarry_assembly::{
    block_subsidy, AssemblyConfig, BlockAssembler, BlockTemplate, FundingStream, RewardAddress,
    SpentOutput, StreamRecipient,
};
use quarry_types::script::pay_to_pubkey_hash;
use quarry_types::{
    Amount, ChainValueBalances, OutPoint, TipInfo, Transaction, TxId, TxOut, COIN,
};
use std::collections::HashMap;

const NOW: u64 = 1_700_000_600;

struct Fixture {
    coins: HashMap<OutPoint, SpentOutput>,
    next_coin: u64,
}

impl Fixture {
    fn new() -> Self {
        Self {
            coins: HashMap::new(),
            next_coin: 0,
        }
    }

    fn fund(&mut self, value: Amount, height: u32) -> OutPoint {
        self.next_coin += 1;
        let mut txid = [0x77u8; 32];
        txid[..8].copy_from_slice(&self.next_coin.to_le_bytes());
        let outpoint = OutPoint::new(txid, 0);
        self.coins.insert(
            outpoint,
            SpentOutput {
                value,
                script_pubkey: pay_to_pubkey_hash(&[0x11; 20]),
                height,
            },
        );
        outpoint
    }

    fn tip(&self, balances: ChainValueBalances) -> TipInfo {
        TipInfo {
            hash: [0xAA; 32],
            height: 100,
            median_time_past: 1_700_000_000,
            next_bits: 0x2100_ffff,
            chain_value_balances: balances,
        }
    }

    fn monitored_tip(&self) -> TipInfo {
        self.tip(ChainValueBalances {
            sprout: Some(10 * COIN),
            sapling: Some(10 * COIN),
            orchard: Some(10 * COIN),
        })
    }
}

fn assemble(
    fixture: &Fixture,
    config: AssemblyConfig,
    pool: &SnapshotPool,
    tip: &TipInfo,
    address: &RewardAddress,
) -> BlockTemplate {
    let mut view = ScratchLedger::new(fixture.coins.clone());
    BlockAssembler::new(config)
        .assemble(&mut view, pool, &NullProofs, tip, address, NOW)
        .unwrap()
}

fn template_order(template: &BlockTemplate) -> Vec<TxId> {
    template
        .block
        .transactions
        .iter()
        .map(|tx| tx.txid())
        .collect()
}

/// The two-phase ordering scenario: the high-priority candidate goes
/// first while the reserved priority space lasts; once crossed, the
/// remainder is ordered by fee rate even where priority disagrees.
#[test]
fn test_two_phase_ordering_switches_to_fee() {
    init_tracing();
    let mut fixture = Fixture::new();

    // A: old, high-value input; towering priority, modest fee.
    let coin_a = fixture.fund(10 * COIN, 1);
    let a = p2pkh_tx(&[coin_a], &[10 * COIN - 300]);

    // B and C: fresh coins, identical priority, fees 10000 vs 1000.
    let coin_b = fixture.fund(COIN, 100);
    let b = p2pkh_tx(&[coin_b], &[COIN - 10_000]);
    let coin_c = fixture.fund(COIN, 100);
    let c = p2pkh_tx(&[coin_c], &[COIN - 1_000]);

    // D: older and larger than B/C (higher priority) but the worst fee.
    // Priority ordering would place it right after A.
    let coin_d = fixture.fund(2 * COIN, 95);
    let d = p2pkh_tx(&[coin_d], &[2 * COIN - 500]);

    let ids = [a.txid(), b.txid(), c.txid(), d.txid()];
    let pool = SnapshotPool::new(vec![d, c, b, a]);

    // Priority space covers little more than the coinbase reservation,
    // so the first accepted candidate crosses it.
    let config = AssemblyConfig {
        priority_size: 1001,
        ..Default::default()
    };
    let tip = fixture.monitored_tip();
    let template = assemble(&fixture, config, &pool, &tip, &miner_address());

    let order = template_order(&template);
    assert!(template.block.transactions[0].is_coinbase());
    assert_eq!(
        &order[1..],
        &[ids[0], ids[1], ids[2], ids[3]],
        "expected A by priority, then B, C, D by fee rate"
    );
}

/// Dependency promotion: D spends an output of pending E. D stays
/// blocked until E is included, then immediately outbids the rest of
/// the queue on fee.
#[test]
fn test_dependent_promoted_right_after_producer() {
    init_tracing();
    let mut fixture = Fixture::new();

    let coin_e = fixture.fund(COIN, 90);
    let e = p2pkh_tx(&[coin_e], &[COIN - 8_000]);
    let d = p2pkh_tx(&[OutPoint::new(e.txid(), 0)], &[COIN - 58_000]);

    let coin_f = fixture.fund(COIN, 90);
    let f = p2pkh_tx(&[coin_f], &[COIN - 6_000]);

    let (e_id, d_id, f_id) = (e.txid(), d.txid(), f.txid());
    let pool = SnapshotPool::new(vec![d, f, e]);

    // Start directly in fee ordering.
    let config = AssemblyConfig {
        priority_size: 0,
        ..Default::default()
    };
    let tip = fixture.monitored_tip();
    let template = assemble(&fixture, config, &pool, &tip, &miner_address());

    let order = template_order(&template);
    // E (8000) first, which unblocks D (50000) ahead of F (6000).
    assert_eq!(&order[1..], &[e_id, d_id, f_id]);
    invariants::check_dependency_order(&template).unwrap();
}

/// Turnstile: a candidate that would drive the sapling pool negative is
/// excluded; an unrelated compensating candidate is evaluated
/// independently and the pools stay non-negative.
#[test]
fn test_turnstile_rejection_is_independent() {
    init_tracing();
    let mut fixture = Fixture::new();

    // Withdraws 5000 from a sapling pool holding only 1000. Highest
    // fee, so it is evaluated first.
    let coin_v = fixture.fund(COIN, 90);
    let mut violator = p2pkh_tx(&[coin_v], &[COIN + 5_000 - 20_000]);
    violator.sapling_value_balance = 5_000;

    // Shields 2000 into the pool.
    let coin_s = fixture.fund(COIN, 90);
    let mut shielder = p2pkh_tx(&[coin_s], &[COIN - 2_000 - 9_000]);
    shielder.sapling_value_balance = -2_000;

    let (violator_id, shielder_id) = (violator.txid(), shielder.txid());
    let pool = SnapshotPool::new(vec![violator, shielder]);

    let tip = fixture.tip(ChainValueBalances {
        sprout: Some(0),
        sapling: Some(1_000),
        orchard: Some(0),
    });
    let template = assemble(
        &fixture,
        AssemblyConfig::default(),
        &pool,
        &tip,
        &miner_address(),
    );

    let order = template_order(&template);
    assert!(!order.contains(&violator_id));
    assert!(order.contains(&shielder_id));
}

/// With unknown ancestor balances the guard degrades to unmonitored and
/// the same candidate is admitted.
#[test]
fn test_turnstile_degrades_when_history_incomplete() {
    init_tracing();
    let mut fixture = Fixture::new();

    let coin = fixture.fund(COIN, 90);
    let mut unshielder = p2pkh_tx(&[coin], &[COIN + 5_000 - 20_000]);
    unshielder.sapling_value_balance = 5_000;
    let id = unshielder.txid();
    let pool = SnapshotPool::new(vec![unshielder]);

    let tip = fixture.tip(ChainValueBalances {
        sprout: Some(0),
        sapling: None,
        orchard: Some(0),
    });
    let template = assemble(
        &fixture,
        AssemblyConfig::default(),
        &pool,
        &tip,
        &miner_address(),
    );
    assert!(template_order(&template).contains(&id));
}

/// Reward conservation with funding streams and a shielded miner
/// address: the coinbase mints exactly subsidy + fees, shares included.
#[test]
fn test_reward_conservation_with_streams_and_shielded_miner() {
    init_tracing();
    let mut fixture = Fixture::new();

    let coin = fixture.fund(COIN, 90);
    let spend = p2pkh_tx(&[coin], &[COIN - 4_000]);
    let pool = SnapshotPool::new(vec![spend]);

    let mut config = AssemblyConfig::default();
    config.reward.funding_activation_height = 50;
    config.reward.funding_streams = vec![
        FundingStream {
            recipient: StreamRecipient::Transparent {
                script_pubkey: pay_to_pubkey_hash(&[0x88; 20]),
            },
            numerator: 8,
            denominator: 100,
            start_height: 50,
            end_height: 10_000,
        },
        FundingStream {
            recipient: StreamRecipient::Shielded {
                recipient: [0x99; 43],
            },
            numerator: 12,
            denominator: 100,
            start_height: 50,
            end_height: 10_000,
        },
    ];
    let expected_subsidy = block_subsidy(101, &config.reward);

    let tip = fixture.monitored_tip();
    let template = assemble(
        &fixture,
        config.clone(),
        &pool,
        &tip,
        &RewardAddress::Sapling {
            recipient: [0x44; 43],
        },
    );

    let coinbase = &template.block.transactions[0];
    assert_eq!(template.total_fees, 4_000);
    assert_eq!(coinbase.value_out(), expected_subsidy + 4_000);
    // Miner share plus the shielded stream both went through the proof
    // service.
    assert_eq!(coinbase.shielded_outputs.len(), 2);
    assert!(coinbase.binding_sig.is_some());
    invariants::validate_template(&template, BlockAssembler::new(config).config()).unwrap();
}

/// Size and sigop bounds hold whatever the pool offers.
#[test]
fn test_size_and_sigop_caps_respected() {
    init_tracing();

    // Size cap: room for exactly two 185-byte transactions.
    let mut fixture = Fixture::new();
    let txs: Vec<Transaction> = (0..4)
        .map(|i| {
            let coin = fixture.fund(COIN, 90);
            p2pkh_tx(&[coin], &[COIN - 1_000 * (i + 1)])
        })
        .collect();
    let pool = SnapshotPool::new(txs);
    let config = AssemblyConfig {
        max_block_size: 1400,
        priority_size: 0,
        ..Default::default()
    };
    let tip = fixture.monitored_tip();
    let template = assemble(&fixture, config.clone(), &pool, &tip, &miner_address());
    assert_eq!(template.block.transactions.len(), 3);
    assert!(template.total_size <= 1400);

    // Sigop cap: each transaction carries 50 sigops; only one fits
    // under a cap of 200 with 100 reserved.
    let mut fixture = Fixture::new();
    let heavy: Vec<Transaction> = (0..2)
        .map(|i| {
            let coin = fixture.fund(COIN, 90);
            let mut tx = p2pkh_tx(&[coin], &[COIN - 5_000 * (i + 1)]);
            tx.outputs.push(TxOut {
                value: 0,
                script_pubkey: vec![0xac; 49],
            });
            tx
        })
        .collect();
    let pool = SnapshotPool::new(heavy);
    let config = AssemblyConfig {
        max_sigops: 200,
        priority_size: 0,
        ..Default::default()
    };
    let tip = fixture.monitored_tip();
    let template = assemble(&fixture, config, &pool, &tip, &miner_address());
    assert_eq!(template.block.transactions.len(), 2);
    let total_sigops: u32 = template.tx_sigops.iter().sum();
    assert!(total_sigops <= 200);
}

/// Free transactions are crowded out past the minimum block size unless
/// an operator override vouches for them.
#[test]
fn test_free_transactions_need_an_override() {
    init_tracing();
    let mut fixture = Fixture::new();

    let coin = fixture.fund(COIN, 100);
    let free = p2pkh_tx(&[coin], &[COIN]);
    let free_id = free.txid();

    let config = AssemblyConfig {
        priority_size: 0,
        min_block_size: 0,
        ..Default::default()
    };
    let tip = fixture.monitored_tip();

    let pool = SnapshotPool::new(vec![free.clone()]);
    let template = assemble(&fixture, config.clone(), &pool, &tip, &miner_address());
    assert!(!template_order(&template).contains(&free_id));

    // The same transaction with a fee override delta gets in.
    let mut pool = SnapshotPool::new(vec![free]);
    pool.set_deltas(free_id, 0.0, 50_000);
    let template = assemble(&fixture, config, &pool, &tip, &miner_address());
    assert!(template_order(&template).contains(&free_id));
}

/// Rebuilding from an unchanged pool and tip selects the same set with
/// the same fees.
#[test]
fn test_unchanged_pool_rebuild_is_idempotent() {
    init_tracing();
    let mut fixture = Fixture::new();
    let txs: Vec<Transaction> = (0..5)
        .map(|i| {
            let coin = fixture.fund(COIN, 90 - i as u32);
            p2pkh_tx(&[coin], &[COIN - 700 * (i + 1)])
        })
        .collect();
    let pool = SnapshotPool::new(txs);
    let tip = fixture.monitored_tip();

    let first = assemble(
        &fixture,
        AssemblyConfig::default(),
        &pool,
        &tip,
        &miner_address(),
    );
    let second = assemble(
        &fixture,
        AssemblyConfig::default(),
        &pool,
        &tip,
        &miner_address(),
    );

    assert_eq!(template_order(&first), template_order(&second));
    assert_eq!(first.total_fees, second.total_fees);
    assert_eq!(first.tx_fees, second.tx_fees);
}
