//! Blocks, headers, and commitment roots.

use crate::transaction::Transaction;
use crate::{sha256d, Hash};
use serde::{Deserialize, Serialize};

/// Block header. The nonce and solution are filled in by the mining
/// loop; everything else is fixed at template-assembly time (the merkle
/// root and block commitments change when the coinbase extra-nonce is
/// incremented).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Header format version.
    pub version: u32,
    /// Parent block hash.
    pub prev_hash: Hash,
    /// Merkle root over the transaction ids.
    pub merkle_root: Hash,
    /// Derived commitment over the chain-history and auth-data roots.
    pub block_commitments: Hash,
    /// Unix timestamp.
    pub time: u64,
    /// Compact difficulty target.
    pub bits: u32,
    /// 256-bit search nonce.
    pub nonce: [u8; 32],
    /// Proof-of-work solution bytes.
    pub solution: Vec<u8>,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            version: 4,
            prev_hash: [0u8; 32],
            merkle_root: [0u8; 32],
            block_commitments: [0u8; 32],
            time: 0,
            bits: 0,
            nonce: [0u8; 32],
            solution: Vec::new(),
        }
    }
}

impl BlockHeader {
    /// The solver input: every header field except the nonce and the
    /// solution.
    pub fn solver_input(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(108);
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&self.prev_hash);
        data.extend_from_slice(&self.merkle_root);
        data.extend_from_slice(&self.block_commitments);
        data.extend_from_slice(&self.time.to_le_bytes());
        data.extend_from_slice(&self.bits.to_le_bytes());
        data
    }

    /// Block hash: SHA-256d over the full serialized header.
    pub fn hash(&self) -> Hash {
        let mut data = self.solver_input();
        data.extend_from_slice(&self.nonce);
        data.extend_from_slice(&(self.solution.len() as u32).to_le_bytes());
        data.extend_from_slice(&self.solution);
        sha256d(&data)
    }
}

/// A block: header plus ordered transactions, reward transaction first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// Transactions; index 0 is the reward transaction.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Merkle root over the transaction ids.
    pub fn merkle_root(&self) -> Hash {
        merkle_root(self.transactions.iter().map(|tx| tx.txid()))
    }

    /// Merkle root over the transactions' authorizing-data digests.
    pub fn auth_data_root(&self) -> Hash {
        merkle_root(self.transactions.iter().map(|tx| tx.auth_digest()))
    }
}

/// Pairwise SHA-256d merkle root; an odd node is paired with itself.
/// An empty leaf set hashes to all zeroes.
pub fn merkle_root(leaves: impl Iterator<Item = Hash>) -> Hash {
    let mut level: Vec<Hash> = leaves.collect();
    if level.is_empty() {
        return [0u8; 32];
    }
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = *level.last().expect("level is non-empty");
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut data = [0u8; 64];
                data[..32].copy_from_slice(&pair[0]);
                data[32..].copy_from_slice(&pair[1]);
                sha256d(&data)
            })
            .collect();
    }
    level[0]
}

/// Derives the header's block-commitments field from the chain-history
/// root and the auth-data root.
pub fn derive_block_commitments(history_root: &Hash, auth_data_root: &Hash) -> Hash {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(history_root);
    data[32..].copy_from_slice(auth_data_root);
    sha256d(&data)
}
