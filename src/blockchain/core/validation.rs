use crate::error::{ChainError, IntegrityViolation};
use crate::miner::valid_proof;

use super::chain::Block;

/// Walks the chain from genesis and reports the first block that breaks
/// sequencing, hash linkage or the proof predicate.
pub fn validate_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks.first().ok_or(ChainError::EmptyChain)?;
    if !genesis.is_genesis() {
        return Err(ChainError::ChainIntegrityViolation {
            index: genesis.index,
            kind: IntegrityViolation::InvalidGenesis,
        });
    }

    for pair in blocks.windows(2) {
        let (previous, block) = (&pair[0], &pair[1]);

        if block.index != previous.index + 1 {
            return Err(ChainError::ChainIntegrityViolation {
                index: block.index,
                kind: IntegrityViolation::IndexOutOfSequence {
                    expected: previous.index + 1,
                    found: block.index,
                },
            });
        }

        let expected = previous.hash()?;
        if block.previous_hash != expected {
            return Err(ChainError::ChainIntegrityViolation {
                index: block.index,
                kind: IntegrityViolation::PreviousHashMismatch {
                    expected,
                    found: block.previous_hash.clone(),
                },
            });
        }

        if !valid_proof(previous.proof, block.proof) {
            return Err(ChainError::ChainIntegrityViolation {
                index: block.index,
                kind: IntegrityViolation::InvalidProof {
                    last_proof: previous.proof,
                    proof: block.proof,
                },
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Blockchain;

    fn mined_chain(blocks: usize) -> Vec<Block> {
        let mut chain = Blockchain::new();
        for i in 0..blocks {
            chain
                .submit_transaction("alice", format!("report {}", i), format!("t{}", i))
                .unwrap();
            chain.mine().unwrap();
        }
        chain.blocks().to_vec()
    }

    #[test]
    fn test_valid_chain() {
        assert!(validate_chain(&mined_chain(2)).is_ok());
    }

    #[test]
    fn test_empty_chain() {
        assert_eq!(validate_chain(&[]), Err(ChainError::EmptyChain));
    }

    #[test]
    fn test_bad_genesis() {
        let mut blocks = mined_chain(0);
        blocks[0].previous_hash = "0".to_string();
        assert!(matches!(
            validate_chain(&blocks),
            Err(ChainError::ChainIntegrityViolation { index: 1, kind: IntegrityViolation::InvalidGenesis })
        ));
    }

    #[test]
    fn test_index_gap() {
        let mut blocks = mined_chain(2);
        blocks[2].index = 5;
        assert!(matches!(
            validate_chain(&blocks),
            Err(ChainError::ChainIntegrityViolation {
                index: 5,
                kind: IntegrityViolation::IndexOutOfSequence { expected: 3, found: 5 }
            })
        ));
    }

    #[test]
    fn test_tampered_payload_detected_at_successor() {
        let mut blocks = mined_chain(2);
        blocks[1].transactions[0].report = "edited".to_string();
        assert!(matches!(
            validate_chain(&blocks),
            Err(ChainError::ChainIntegrityViolation {
                index: 3,
                kind: IntegrityViolation::PreviousHashMismatch { .. }
            })
        ));
    }

    #[test]
    fn test_invalid_proof() {
        let mut chain = Blockchain::new();
        chain.seal_block(Some(1)).unwrap();
        assert!(matches!(
            chain.validate(),
            Err(ChainError::ChainIntegrityViolation {
                index: 2,
                kind: IntegrityViolation::InvalidProof { last_proof: 100, proof: 1 }
            })
        ));
    }
}
