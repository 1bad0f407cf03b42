//! Reward (coinbase) transaction construction.
//!
//! Distributes the block subsidy across the configured recipients (the
//! founders share before the funding-stream activation height,
//! structured streams after it) and routes the remainder plus fees to
//! the miner's reward address. Shielded outputs go through the external
//! proof service; any proof failure aborts the whole template build.

use crate::config::{RewardScheduleConfig, StreamRecipient};
use crate::error::Result;
use crate::ports::ProofService;
use quarry_types::{Amount, OutPoint, Transaction, TxIn, TxOut};

/// Where the miner's share of the reward goes. Each variant carries
/// exactly the data its output-construction logic needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RewardAddress {
    /// Pay to a transparent script.
    Transparent {
        /// Locking script for the miner output.
        script_pubkey: Vec<u8>,
    },
    /// Shield into the sapling pool.
    Sapling {
        /// Raw sapling payment-address bytes.
        recipient: [u8; 43],
    },
    /// Shield into the orchard pool.
    Orchard {
        /// Raw orchard address bytes.
        recipient: [u8; 43],
    },
}

impl RewardAddress {
    /// Whether the miner output is shielded.
    pub fn is_shielded(&self) -> bool {
        !matches!(self, RewardAddress::Transparent { .. })
    }
}

/// Block subsidy at `height` under the halving schedule.
pub fn block_subsidy(height: u32, schedule: &RewardScheduleConfig) -> Amount {
    let halvings = height / schedule.halving_interval;
    if halvings >= 63 {
        return 0;
    }
    schedule.base_subsidy >> halvings
}

/// The coinbase unlocking script: block height plus the extra nonce.
pub fn coinbase_script_sig(height: u32, extra_nonce: u32) -> Vec<u8> {
    let mut script = Vec::with_capacity(8);
    script.extend_from_slice(&height.to_le_bytes());
    script.extend_from_slice(&extra_nonce.to_le_bytes());
    script
}

/// Builds the reward transaction for one template.
pub struct CoinbaseBuilder<'a> {
    height: u32,
    fees: Amount,
    schedule: &'a RewardScheduleConfig,
    proofs: &'a dyn ProofService,
}

impl<'a> CoinbaseBuilder<'a> {
    /// Creates a builder for a block at `height` that collected `fees`.
    pub fn new(
        height: u32,
        fees: Amount,
        schedule: &'a RewardScheduleConfig,
        proofs: &'a dyn ProofService,
    ) -> Self {
        Self {
            height,
            fees,
            schedule,
            proofs,
        }
    }

    /// Constructs the reward transaction paying `address`.
    pub fn build(&self, address: &RewardAddress) -> Result<Transaction> {
        let mut tx = Transaction {
            inputs: vec![TxIn {
                prevout: OutPoint::null(),
                script_sig: coinbase_script_sig(self.height, 0),
            }],
            // Expiry pinned to the block height: the reward transaction
            // is only ever valid in this block.
            expiry_height: self.height,
            ..Default::default()
        };

        let miner_reward = self.distribute_shares(&mut tx)? + self.fees;

        match address {
            RewardAddress::Transparent { script_pubkey } => {
                // Miner output first; share outputs follow.
                tx.outputs.insert(
                    0,
                    TxOut {
                        value: miner_reward,
                        script_pubkey: script_pubkey.clone(),
                    },
                );
            }
            RewardAddress::Sapling { recipient } => {
                let odesc = self.proofs.sapling_output(recipient, miner_reward)?;
                tx.shielded_outputs.push(odesc);
                tx.sapling_value_balance -= miner_reward;
            }
            RewardAddress::Orchard { recipient } => {
                let sighash = tx.txid();
                let actions =
                    self.proofs
                        .orchard_reward_actions(recipient, miner_reward, &sighash)?;
                tx.orchard_actions = actions;
                tx.orchard_value_balance -= miner_reward;
            }
        }

        if !tx.shielded_outputs.is_empty() || !tx.orchard_actions.is_empty() {
            // One aggregate binding signature across all shielded value
            // flows, computed after every reward output is placed.
            let sighash = tx.txid();
            tx.binding_sig = Some(
                self.proofs
                    .binding_signature(tx.sapling_value_balance, &sighash)?,
            );
        }

        Ok(tx)
    }

    /// Adds the mandated share outputs and returns what is left of the
    /// subsidy for the miner.
    fn distribute_shares(&self, tx: &mut Transaction) -> Result<Amount> {
        let subsidy = block_subsidy(self.height, self.schedule);
        let mut miner_reward = subsidy;

        if self.height == 0 {
            return Ok(miner_reward);
        }

        if self.height >= self.schedule.funding_activation_height {
            for stream in &self.schedule.funding_streams {
                if !stream.active_at(self.height) {
                    continue;
                }
                let value = stream.value(subsidy);
                miner_reward -= value;
                match &stream.recipient {
                    StreamRecipient::Transparent { script_pubkey } => {
                        tx.outputs.push(TxOut {
                            value,
                            script_pubkey: script_pubkey.clone(),
                        });
                    }
                    StreamRecipient::Shielded { recipient } => {
                        let odesc = self.proofs.sapling_output(recipient, value)?;
                        tx.shielded_outputs.push(odesc);
                        tx.sapling_value_balance -= value;
                    }
                }
            }
        } else if self.height <= self.schedule.last_founders_height {
            if let Some(script) = self.schedule.founders_script_at(self.height) {
                // Founders share is 20% of the subsidy.
                let founders = subsidy / 5;
                miner_reward -= founders;
                tx.outputs.push(TxOut {
                    value: founders,
                    script_pubkey: script.to_vec(),
                });
            }
        }
        // Past the founders window with no streams active yet, the share
        // ends without replacement.

        Ok(miner_reward)
    }
}
