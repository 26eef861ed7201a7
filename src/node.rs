use crate::blockchain::Block;
use crate::config::Config;
use crate::error::ChainError;
use crate::ledger::SharedLedger;
use crate::miner::ProofSearch;
use crate::persistence::{load_blockchain, Persistence};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default`.
pub fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Owns one ledger for the lifetime of the process together with the store it
/// is snapshotted to after every seal.
pub struct Node {
    pub config: Config,
    pub ledger: SharedLedger,
    persistence: Arc<dyn Persistence>,
    // held across snapshot and write so stores only ever move forward
    persist_lock: Mutex<()>,
    search: ProofSearch,
    cancel: Arc<AtomicBool>,
}

impl Node {
    /// Open the configured store and load (or create) the chain.
    pub fn init(config: Config) -> Result<Self, ChainError> {
        let persistence = config.storage.open()?;
        info!(
            backend = ?config.storage.backend,
            path = %config.storage.path,
            "opened storage"
        );
        Self::with_persistence(config, persistence)
    }

    pub fn with_persistence(
        config: Config,
        persistence: Arc<dyn Persistence>,
    ) -> Result<Self, ChainError> {
        let chain = load_blockchain(persistence.as_ref())?;
        let cancel = Arc::new(AtomicBool::new(false));
        let search = config.miner.proof_search().with_cancel_flag(cancel.clone());
        let node = Self {
            config,
            ledger: SharedLedger::new(chain),
            persistence,
            persist_lock: Mutex::new(()),
            search,
            cancel,
        };
        node.persist()?;
        Ok(node)
    }

    pub fn submit_transaction(
        &self,
        sender: impl Into<String>,
        report: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Result<u64, ChainError> {
        self.ledger.submit_transaction(sender, report, transaction_id)
    }

    /// Seal the pending pool into a new block and snapshot the chain.
    ///
    /// The block is on the chain once sealed, so a failed snapshot is logged
    /// rather than returned; the next successful [`Node::persist`] writes it.
    pub fn mine(&self) -> Result<Block, ChainError> {
        let block = self.ledger.mine(&self.search)?;
        if let Err(e) = self.persist() {
            warn!(index = block.index, error = %e, "sealed block but failed to persist chain");
        }
        Ok(block)
    }

    /// Record one report under a fresh transaction ID and seal it straight
    /// away.
    pub fn push_report(
        &self,
        sender: impl Into<String>,
        report: impl Into<String>,
    ) -> Result<(String, Block), ChainError> {
        let sender = sender.into();
        if sender.trim().is_empty() {
            return Err(ChainError::InvalidInput("sender cannot be empty".to_string()));
        }
        let transaction_id = Transaction::generate_id();
        self.ledger
            .submit_transaction(sender, report, transaction_id.clone())?;
        let block = self.mine()?;
        Ok((transaction_id, block))
    }

    pub fn persist(&self) -> Result<(), ChainError> {
        let _guard = self.persist_lock.lock();
        self.persistence.save_chain(&self.ledger.blocks())
    }

    /// Abort any running proof search. Later `mine` calls fail with
    /// [`ChainError::ProofSearchCancelled`].
    pub fn shutdown(&self) {
        info!("cancelling proof search");
        self.cancel.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;

    /// Accepts the first save, then fails every later one.
    struct FlakyStore {
        inner: InMemoryPersistence,
        saves: std::sync::atomic::AtomicUsize,
    }

    impl Persistence for FlakyStore {
        fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
            if self.saves.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(ChainError::IoError("disk full".to_string()));
            }
            self.inner.save_chain(blocks)
        }

        fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
            self.inner.load_chain()
        }
    }

    #[test]
    fn test_init_persists_genesis() {
        let store = Arc::new(InMemoryPersistence::new());
        let node = Node::with_persistence(Config::default(), store.clone()).unwrap();
        assert_eq!(node.ledger.len(), 1);
        assert_eq!(store.load_chain().unwrap().map(|b| b.len()), Some(1));
    }

    #[test]
    fn test_push_report_seals_and_persists() {
        let store = Arc::new(InMemoryPersistence::new());
        let node = Node::with_persistence(Config::default(), store.clone()).unwrap();

        let (id, block) = node.push_report("alice", "x-ray").unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions[0].transaction_id, id);
        assert_eq!(node.ledger.transactions_by_sender("alice"), vec![id]);

        let reloaded = Node::with_persistence(Config::default(), store).unwrap();
        assert_eq!(reloaded.ledger.blocks(), node.ledger.blocks());
    }

    #[test]
    fn test_push_report_survives_failed_snapshot() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryPersistence::new(),
            saves: Default::default(),
        });
        let node = Node::with_persistence(Config::default(), store.clone()).unwrap();

        let (id, block) = node.push_report("alice", "x-ray").unwrap();
        assert_eq!(block.index, 2);
        let (index, tx) = node.ledger.find_transaction(&id).unwrap();
        assert_eq!((index, tx.report.as_str()), (2, "x-ray"));
        assert_eq!(store.load_chain().unwrap().map(|b| b.len()), Some(1));
    }

    #[test]
    fn test_push_report_rejects_empty_sender() {
        let node = Node::with_persistence(Config::default(), Arc::new(InMemoryPersistence::new())).unwrap();
        assert!(matches!(node.push_report("  ", "x-ray"), Err(ChainError::InvalidInput(_))));
        assert!(node.ledger.pending_transactions().is_empty());
    }

    #[test]
    fn test_shutdown_cancels_mining() {
        let node = Node::with_persistence(Config::default(), Arc::new(InMemoryPersistence::new())).unwrap();
        node.shutdown();
        assert_eq!(node.mine(), Err(ChainError::ProofSearchCancelled));
        assert_eq!(node.ledger.len(), 1);
    }
}
