//! Thread-safe handle over a single [`Blockchain`].
//!
//! The chain and the pending pool form one mutual-exclusion domain behind a
//! single `RwLock`. Mutations take the write lock; queries take the read lock
//! or return owned copies so callers never hold the lock across I/O.

use crate::blockchain::{Block, Blockchain};
use crate::error::ChainError;
use crate::miner::ProofSearch;
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<Blockchain>>,
}

impl SharedLedger {
    pub fn new(chain: Blockchain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    pub fn submit_transaction(
        &self,
        sender: impl Into<String>,
        report: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Result<u64, ChainError> {
        self.inner
            .write()
            .submit_transaction(sender, report, transaction_id)
    }

    /// Seal under the write lock, searching for the proof while holding it
    /// when none is supplied.
    pub fn seal_block(&self, proof: Option<u64>) -> Result<Block, ChainError> {
        self.inner.write().seal_block(proof)
    }

    /// Search for the next proof without holding the lock, then seal. If
    /// another seal moved the tip in the meantime the search restarts against
    /// the new tip.
    pub fn mine(&self, search: &ProofSearch) -> Result<Block, ChainError> {
        loop {
            let (tip_index, last_proof) = {
                let chain = self.inner.read();
                let last = chain.last_block()?;
                (last.index, last.proof)
            };

            let proof = search.run(last_proof)?;

            let mut chain = self.inner.write();
            if chain.last_block()?.index == tip_index {
                return chain.seal_block(Some(proof));
            }
            debug!(tip_index, "chain tip moved during proof search, retrying");
        }
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.inner.read().blocks().to_vec()
    }

    pub fn last_block(&self) -> Result<Block, ChainError> {
        self.inner.read().last_block().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.inner.read().pending_transactions().to_vec()
    }

    pub fn transactions_by_sender(&self, sender: &str) -> Vec<String> {
        self.inner.read().transactions_by_sender(sender)
    }

    pub fn find_transaction(&self, transaction_id: &str) -> Option<(u64, Transaction)> {
        self.inner
            .read()
            .find_transaction(transaction_id)
            .map(|(index, tx)| (index, tx.clone()))
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        self.inner.read().validate()
    }

    /// Run `f` against the chain under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Blockchain) -> R) -> R {
        f(&self.inner.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_mine_outside_lock_matches_inline_search() {
        let ledger = SharedLedger::new(Blockchain::new());
        ledger.submit_transaction("alice", "x-ray", "t1").unwrap();
        let block = ledger.mine(&ProofSearch::unbounded()).unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 35293);
        assert_eq!(block.transactions.len(), 1);
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn test_bounded_mine_reports_exhaustion_and_keeps_pool() {
        let ledger = SharedLedger::new(Blockchain::new());
        ledger.submit_transaction("alice", "x-ray", "t1").unwrap();
        let search = ProofSearch::unbounded().with_max_attempts(5);
        assert!(matches!(
            ledger.mine(&search),
            Err(ChainError::ProofSearchExhausted { .. })
        ));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn test_concurrent_submit_and_seal_loses_nothing() {
        let ledger = SharedLedger::new(Blockchain::new());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        ledger
                            .submit_transaction(format!("w{}", w), "r", format!("{}-{}", w, i))
                            .unwrap();
                    }
                })
            })
            .collect();
        let sealer = {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for _ in 0..3 {
                    ledger.mine(&ProofSearch::unbounded()).unwrap();
                }
            })
        };
        for handle in writers {
            handle.join().unwrap();
        }
        sealer.join().unwrap();
        ledger.mine(&ProofSearch::unbounded()).unwrap();

        let sealed: Vec<String> = ledger
            .blocks()
            .iter()
            .flat_map(|b| b.transactions.iter().map(|t| t.transaction_id.clone()))
            .collect();
        let unique: HashSet<_> = sealed.iter().cloned().collect();
        assert_eq!(sealed.len(), 200);
        assert_eq!(unique.len(), 200);
        assert!(ledger.pending_transactions().is_empty());
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn test_read_snapshot() {
        let ledger = SharedLedger::new(Blockchain::new());
        let genesis_proof = ledger.read(|chain| chain.last_block().map(|b| b.proof));
        assert_eq!(genesis_proof, Ok(100));
    }
}
