//! Error types for ReportChain

/// Why a chain failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityViolation {
    #[error("genesis block is malformed")]
    InvalidGenesis,
    #[error("expected index {expected}, found {found}")]
    IndexOutOfSequence { expected: u64, found: u64 },
    #[error("previous_hash {found} does not match predecessor hash {expected}")]
    PreviousHashMismatch { expected: String, found: String },
    #[error("proof {proof} does not satisfy the predicate against {last_proof}")]
    InvalidProof { last_proof: u64, proof: u64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChainError {
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Chain integrity violation at block {index}: {kind}")]
    ChainIntegrityViolation { index: u64, kind: IntegrityViolation },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Proof search against {last_proof} exhausted after {attempts} attempts")]
    ProofSearchExhausted { last_proof: u64, attempts: u64 },
    #[error("Proof search cancelled")]
    ProofSearchCancelled,
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
