//! In-memory chain node and collaborator fakes shared by the
//! integration tests.

use quarry_assembly::{
    AssemblyConfig, AssemblyError, BlockAssembler, BlockTemplate, LedgerView, PendingPool,
    ProofFailure, ProofService, RewardAddress, SpentOutput,
};
use quarry_mining::{BlockSubmitter, PowSolver, SourceFailure, SubmitOutcome, TemplateSource};
use quarry_types::script::pay_to_pubkey_hash;
use quarry_types::{
    sha256d, Amount, Block, ChainValueBalances, Hash, OutPoint, OutputDescription, TipInfo,
    Transaction, TxId, TxIn, TxOut, COIN,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Initializes a test tracing subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A compact-bits encoding whose expanded target accepts any hash.
pub const PERMISSIVE_BITS: u32 = 0x2100_ffff;

/// A transaction spending `inputs` into P2PKH outputs of the given
/// values.
pub fn p2pkh_tx(inputs: &[OutPoint], outputs: &[Amount]) -> Transaction {
    Transaction {
        inputs: inputs
            .iter()
            .map(|outpoint| TxIn {
                prevout: *outpoint,
                script_sig: vec![0x00; 72],
            })
            .collect(),
        outputs: outputs
            .iter()
            .map(|value| TxOut {
                value: *value,
                script_pubkey: pay_to_pubkey_hash(&[0x22; 20]),
            })
            .collect(),
        ..Default::default()
    }
}

/// The standard transparent reward address used by tests.
pub fn miner_address() -> RewardAddress {
    RewardAddress::Transparent {
        script_pubkey: pay_to_pubkey_hash(&[0x55; 20]),
    }
}

/// A proof service that deterministically fabricates descriptions.
#[derive(Default)]
pub struct NullProofs;

impl ProofService for NullProofs {
    fn sapling_output(
        &self,
        recipient: &[u8; 43],
        value: Amount,
    ) -> Result<OutputDescription, ProofFailure> {
        Ok(fabricate(recipient, value, b'S'))
    }

    fn orchard_reward_actions(
        &self,
        recipient: &[u8; 43],
        value: Amount,
        _sighash: &Hash,
    ) -> Result<Vec<OutputDescription>, ProofFailure> {
        Ok(vec![
            fabricate(recipient, value, b'O'),
            fabricate(recipient, 0, b'P'),
        ])
    }

    fn binding_signature(
        &self,
        _value_balance: Amount,
        _sighash: &Hash,
    ) -> Result<[u8; 64], ProofFailure> {
        Ok([0x42; 64])
    }
}

fn fabricate(recipient: &[u8; 43], value: Amount, tag: u8) -> OutputDescription {
    let mut seed = Vec::with_capacity(52);
    seed.push(tag);
    seed.extend_from_slice(recipient);
    seed.extend_from_slice(&value.to_le_bytes());
    OutputDescription {
        cmu: sha256d(&seed),
        proof: vec![tag; 192],
        ciphertext: vec![tag ^ 0xFF; 80],
    }
}

/// A ledger view over an owned coin map; `apply_transaction` mutates
/// only this scratch copy.
pub struct ScratchLedger {
    coins: HashMap<OutPoint, SpentOutput>,
    history_root: Hash,
}

impl ScratchLedger {
    pub fn new(coins: HashMap<OutPoint, SpentOutput>) -> Self {
        Self {
            coins,
            history_root: [0x33; 32],
        }
    }
}

impl LedgerView for ScratchLedger {
    fn spendable_output(&self, outpoint: &OutPoint) -> Option<SpentOutput> {
        self.coins.get(outpoint).cloned()
    }

    fn apply_transaction(&mut self, tx: &Transaction, height: u32) {
        for input in &tx.inputs {
            self.coins.remove(&input.prevout);
        }
        let txid = tx.txid();
        for (index, output) in tx.outputs.iter().enumerate() {
            self.coins.insert(
                OutPoint::new(txid, index as u32),
                SpentOutput {
                    value: output.value,
                    script_pubkey: output.script_pubkey.clone(),
                    height,
                },
            );
        }
    }

    fn contextual_check(&self, _tx: &Transaction, _height: u32) -> Result<(), String> {
        Ok(())
    }

    fn history_root(&self) -> Hash {
        self.history_root
    }
}

/// A fixed pool snapshot with optional override deltas.
pub struct SnapshotPool {
    transactions: Vec<Transaction>,
    deltas: HashMap<TxId, (f64, Amount)>,
    counter: u64,
}

impl SnapshotPool {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            deltas: HashMap::new(),
            counter: 1,
        }
    }

    pub fn set_deltas(&mut self, txid: TxId, priority: f64, fee: Amount) {
        self.deltas.insert(txid, (priority, fee));
    }
}

impl PendingPool for SnapshotPool {
    fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    fn apply_deltas(&self, txid: &TxId, priority: &mut f64, fee: &mut Amount) {
        if let Some((priority_delta, fee_delta)) = self.deltas.get(txid) {
            *priority += priority_delta;
            *fee += fee_delta;
        }
    }

    fn updates_counter(&self) -> u64 {
        self.counter
    }
}

/// Mutable chain state behind the node's ledger-wide lock.
pub struct ChainState {
    pub coins: HashMap<OutPoint, SpentOutput>,
    pub pool: Vec<Transaction>,
    pub pool_counter: u64,
    pub tip: Option<TipInfo>,
    pub accepted: Vec<Block>,
    pub stale_submissions: usize,
    next_coin: u64,
}

impl ChainState {
    /// Adds a confirmed coin and returns its outpoint.
    pub fn fund(&mut self, value: Amount, height: u32) -> OutPoint {
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
}

/// An in-memory node: chain tip, coin set, and pending pool behind one
/// lock, with an assembler wired to in-memory collaborators. Implements
/// the mining loop's `TemplateSource` and `BlockSubmitter` ports.
pub struct TestNode {
    pub state: Mutex<ChainState>,
    assembler: BlockAssembler,
    proofs: NullProofs,
}

impl TestNode {
    pub fn new(config: AssemblyConfig) -> Self {
        let state = ChainState {
            coins: HashMap::new(),
            pool: Vec::new(),
            pool_counter: 1,
            tip: Some(genesis_tip()),
            accepted: Vec::new(),
            stale_submissions: 0,
            next_coin: 0,
        };
        Self {
            state: Mutex::new(state),
            assembler: BlockAssembler::new(config),
            proofs: NullProofs,
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.state.lock().unwrap().accepted.len()
    }

    /// Replaces the tip, as if another node's block connected first.
    pub fn adopt_external_tip(&self, tip: TipInfo) {
        self.state.lock().unwrap().tip = Some(tip);
    }
}

/// The starting tip every `TestNode` boots with.
pub fn genesis_tip() -> TipInfo {
    TipInfo {
        hash: [0xAA; 32],
        height: 100,
        median_time_past: 1_700_000_000,
        next_bits: PERMISSIVE_BITS,
        chain_value_balances: ChainValueBalances {
            sprout: Some(10 * COIN),
            sapling: Some(10 * COIN),
            orchard: Some(10 * COIN),
        },
    }
}

impl TemplateSource for TestNode {
    fn tip(&self) -> Result<Option<TipInfo>, SourceFailure> {
        Ok(self.state.lock().unwrap().tip)
    }

    fn create_template(
        &self,
        reward_address: &RewardAddress,
    ) -> Result<BlockTemplate, AssemblyError> {
        // One lock across the whole build: pool snapshot, ledger view,
        // and selection state never interleave with submissions.
        let state = self.state.lock().unwrap();
        let tip = state.tip.ok_or_else(|| AssemblyError::TemplateInvalid {
            reason: "no chain tip".into(),
        })?;
        let mut view = ScratchLedger::new(state.coins.clone());
        let pool = SnapshotPool::new(state.pool.clone());
        self.assembler.assemble(
            &mut view,
            &pool,
            &self.proofs,
            &tip,
            reward_address,
            tip.median_time_past + 60,
        )
    }

    fn pool_updates_counter(&self) -> u64 {
        self.state.lock().unwrap().pool_counter
    }
}

impl BlockSubmitter for TestNode {
    fn submit(&self, block: &Block) -> SubmitOutcome {
        let mut state = self.state.lock().unwrap();
        let Some(tip) = state.tip else {
            return SubmitOutcome::Rejected;
        };
        if block.header.prev_hash != tip.hash {
            state.stale_submissions += 1;
            return SubmitOutcome::StaleTip;
        }

        let included: HashSet<TxId> = block.transactions.iter().map(|tx| tx.txid()).collect();
        state.pool.retain(|tx| !included.contains(&tx.txid()));
        state.pool_counter += 1;
        state.tip = Some(TipInfo {
            hash: block.header.hash(),
            height: tip.height + 1,
            median_time_past: tip.median_time_past + 1,
            next_bits: tip.next_bits,
            chain_value_balances: tip.chain_value_balances,
        });
        state.accepted.push(block.clone());
        SubmitOutcome::Accepted
    }
}

/// A solver that "finds" one deterministic solution per invocation.
pub struct TrivialSolver;

impl PowSolver for TrivialSolver {
    fn name(&self) -> &str {
        "trivial"
    }

    fn solve(
        &self,
        header_input: &[u8],
        nonce: &[u8; 32],
        cancelled: &dyn Fn() -> bool,
    ) -> Vec<Vec<u8>> {
        if cancelled() {
            return vec![];
        }
        let mut data = header_input.to_vec();
        data.extend_from_slice(nonce);
        vec![sha256d(&data).to_vec()]
    }
}

/// A solver that parks until the gate opens, polling the cancellation
/// predicate like a cooperative solver must.
pub struct GatedSolver {
    pub gate: AtomicBool,
    pub started: AtomicBool,
}

impl GatedSolver {
    pub fn new() -> Self {
        Self {
            gate: AtomicBool::new(false),
            started: AtomicBool::new(false),
        }
    }
}

impl Default for GatedSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PowSolver for GatedSolver {
    fn name(&self) -> &str {
        "gated"
    }

    fn solve(
        &self,
        header_input: &[u8],
        nonce: &[u8; 32],
        cancelled: &dyn Fn() -> bool,
    ) -> Vec<Vec<u8>> {
        self.started.store(true, Ordering::SeqCst);
        loop {
            // Cancellation wins over the gate so a cancelled search
            // never yields a solution for a stale header.
            if cancelled() {
                return vec![];
            }
            if self.gate.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        let mut data = header_input.to_vec();
        data.extend_from_slice(nonce);
        vec![sha256d(&data).to_vec()]
    }
}
