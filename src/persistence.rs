//! Persistence layer for ReportChain
//!
//! The ledger core never touches storage. These backends let the node save a
//! snapshot after each seal and reload it at startup; every reload goes
//! through chain validation.

use crate::blockchain::{Block, Blockchain};
use crate::error::ChainError;
use crate::transaction::Transaction;
use rusqlite::{params, Connection};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::info;

/// Abstraction for persistence backends.
pub trait Persistence: Send + Sync {
    /// Store the full chain. Backends may skip blocks they already hold,
    /// since blocks never change once appended.
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError>;
    /// `None` when nothing has been stored yet.
    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError>;
}

/// Load and validate a stored chain, or start a fresh one.
pub fn load_blockchain(persistence: &dyn Persistence) -> Result<Blockchain, ChainError> {
    match persistence.load_chain()? {
        Some(blocks) => {
            let chain = Blockchain::from_blocks(blocks)?;
            info!(blocks = chain.len(), "loaded chain from storage");
            Ok(chain)
        }
        None => {
            info!("no stored chain found, creating genesis");
            Ok(Blockchain::new())
        }
    }
}

/// The chain as a single JSON array, the `blockchain.json` layout.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Persistence for JsonFileStore {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // write beside the target then rename, so readers never see a torn file
        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, blocks)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| ChainError::IoError(format!("Failed to persist {:?}: {}", self.path, e)))?;
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

/// SQLite-backed store, one row per block.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                idx INTEGER PRIMARY KEY,
                timestamp REAL NOT NULL,
                proof INTEGER NOT NULL,
                previous_hash TEXT NOT NULL,
                hash TEXT NOT NULL,
                transactions TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        Ok(Database { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }

    pub fn block_count(&self) -> Result<u64, ChainError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Persistence for Database {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        for block in blocks {
            let transactions_json = serde_json::to_string(&block.transactions)?;
            tx.execute(
                "INSERT OR IGNORE INTO blocks (idx, timestamp, proof, previous_hash, hash, transactions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    block.index as i64,
                    block.timestamp,
                    block.proof as i64,
                    block.previous_hash,
                    block.hash()?,
                    transactions_json,
                ],
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to save block: {}", e)))?;
        }

        tx.commit().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT idx, timestamp, proof, previous_hash, transactions
                 FROM blocks ORDER BY idx ASC",
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let index: i64 = row.get(0)?;
                let timestamp: f64 = row.get(1)?;
                let proof: i64 = row.get(2)?;
                let previous_hash: String = row.get(3)?;
                let transactions_json: String = row.get(4)?;
                Ok((index, timestamp, proof, previous_hash, transactions_json))
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            let (index, timestamp, proof, previous_hash, transactions_json) =
                row.map_err(|e| ChainError::DatabaseError(format!("Failed to load block: {}", e)))?;
            let transactions: Vec<Transaction> = serde_json::from_str(&transactions_json)?;
            blocks.push(Block {
                index: index as u64,
                timestamp,
                transactions,
                proof: proof as u64,
                previous_hash,
            });
        }

        Ok((!blocks.is_empty()).then_some(blocks))
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    blocks: std::sync::Arc<Mutex<Option<Vec<Block>>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
        let mut stored = self
            .blocks
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        *stored = Some(blocks.to_vec());
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
        let stored = self
            .blocks
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        Ok(stored.clone())
    }
}
