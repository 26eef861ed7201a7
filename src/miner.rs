//! Proof-of-work admission check
//!
//! A candidate `proof` is accepted against the previous block's proof when
//! `sha256(format!("{last_proof}{proof}"))` rendered as hex starts with
//! [`DIFFICULTY_PREFIX`]. The search always scans upward from zero, so the
//! winner is the smallest satisfying nonce.

use crate::error::ChainError;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

pub const DIFFICULTY_PREFIX: &str = "0000";

/// Hex digest of the decimal concatenation of both proofs (no separator).
pub fn proof_digest(last_proof: u64, proof: u64) -> String {
    let guess = format!("{}{}", last_proof, proof);
    hex::encode(Sha256::digest(guess.as_bytes()))
}

pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    proof_digest(last_proof, proof).starts_with(DIFFICULTY_PREFIX)
}

/// Unbounded search. Deterministic for a given `last_proof`.
pub fn proof_of_work(last_proof: u64) -> u64 {
    let mut proof = 0;
    while !valid_proof(last_proof, proof) {
        proof += 1;
    }
    proof
}

/// Caller-bounded variant of [`proof_of_work`]. Scans in the same order, so a
/// successful run returns exactly what the unbounded search would.
#[derive(Debug, Clone, Default)]
pub struct ProofSearch {
    max_attempts: Option<u64>,
    cancel: Option<Arc<AtomicBool>>,
}

impl ProofSearch {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `0` means no cap.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = (max_attempts > 0).then_some(max_attempts);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }

    pub fn run(&self, last_proof: u64) -> Result<u64, ChainError> {
        let mut proof: u64 = 0;
        loop {
            if let Some(max) = self.max_attempts {
                if proof >= max {
                    warn!(last_proof, attempts = max, "proof search exhausted");
                    return Err(ChainError::ProofSearchExhausted { last_proof, attempts: max });
                }
            }
            // poll the cancel flag every 4096 candidates
            if proof % 4096 == 0 {
                if let Some(flag) = &self.cancel {
                    if flag.load(Ordering::Relaxed) {
                        return Err(ChainError::ProofSearchCancelled);
                    }
                }
            }
            if valid_proof(last_proof, proof) {
                return Ok(proof);
            }
            proof += 1;
        }
    }
}
