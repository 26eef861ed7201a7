use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::miner::proof_of_work;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::canonical::to_canonical_string;
use super::validation::validate_chain;

pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position in the chain.
    pub index: u64,
    /// Seconds since the Unix epoch at sealing.
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    /// Lowercase hex hash of the predecessor, or the genesis sentinel.
    pub previous_hash: String,
}

impl Block {
    /// The exact bytes fed to SHA-256 by [`Block::hash`].
    pub fn canonical_string(&self) -> Result<String, ChainError> {
        if !self.timestamp.is_finite() {
            return Err(ChainError::Serialization(format!(
                "block {} has a non-finite timestamp",
                self.index
            )));
        }
        to_canonical_string(self)
    }

    pub fn hash(&self) -> Result<String, ChainError> {
        let canonical = self.canonical_string()?;
        Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    /// Carries the genesis sentinels (index 1, previous_hash `"1"`).
    pub fn is_genesis(&self) -> bool {
        self.index == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

pub(crate) fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// The ledger: an append-only chain plus the pool of pending transactions.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    mempool: Mempool,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Create a ledger holding only the genesis block.
    pub fn new() -> Self {
        let genesis = Block {
            index: 1,
            timestamp: now_timestamp(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        };
        info!(timestamp = genesis.timestamp, "sealed genesis block");
        Blockchain {
            blocks: vec![genesis],
            mempool: Mempool::new(),
        }
    }

    /// Rebuild a ledger from a stored chain. The chain is validated first and
    /// the pending pool starts empty.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        validate_chain(&blocks)?;
        Ok(Blockchain {
            blocks,
            mempool: Mempool::new(),
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last_block(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        self.mempool.get_all_transactions()
    }

    /// Queue a transaction for the next block. Returns the index it is
    /// expected to land in; that is a hint, not a commitment.
    pub fn submit_transaction(
        &mut self,
        sender: impl Into<String>,
        report: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Result<u64, ChainError> {
        let next_index = self.last_block()?.index + 1;
        self.mempool
            .add_transaction(Transaction::new(sender, report, transaction_id));
        Ok(next_index)
    }

    /// Seal the whole pending pool into a new block and append it.
    ///
    /// `previous_hash` is always recomputed from the current tip. `proof` is
    /// taken as given when supplied, otherwise searched for against the tip's
    /// proof.
    pub fn seal_block(&mut self, proof: Option<u64>) -> Result<Block, ChainError> {
        let last = self.last_block()?;
        let previous_hash = last.hash()?;
        let index = last.index + 1;
        let proof = match proof {
            Some(p) => p,
            None => proof_of_work(last.proof),
        };

        let block = Block {
            index,
            timestamp: now_timestamp(),
            transactions: self.mempool.drain(),
            proof,
            previous_hash,
        };

        info!(
            index = block.index,
            proof = block.proof,
            transactions = block.transactions.len(),
            "sealed block"
        );
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Seal with a freshly searched proof.
    pub fn mine(&mut self) -> Result<Block, ChainError> {
        self.seal_block(None)
    }

    /// Transaction IDs sent by `sender`, oldest block first. Pending
    /// transactions are not included.
    pub fn transactions_by_sender(&self, sender: &str) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(|tx| tx.sender == sender)
            .map(|tx| tx.transaction_id.clone())
            .collect()
    }

    /// First sealed transaction carrying `transaction_id`, with the index of
    /// the block holding it.
    pub fn find_transaction(&self, transaction_id: &str) -> Option<(u64, &Transaction)> {
        let found = self.blocks.iter().find_map(|block| {
            block
                .transactions
                .iter()
                .find(|tx| tx.transaction_id == transaction_id)
                .map(|tx| (block.index, tx))
        });
        if found.is_none() {
            debug!(transaction_id, "transaction not found in sealed blocks");
        }
        found
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        validate_chain(&self.blocks)
    }
}
