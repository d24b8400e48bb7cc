//! Block validator
//!
//! Checks a candidate block against the committed ledger and the consensus
//! parameters. Nothing is mutated; committing is a separate step taken only
//! after [`validate_block`] succeeds.

use crate::config::ConsensusParams;
use crate::core::block::Block;
use crate::core::error::ValidationError;
use crate::core::ledger::Ledger;
use crate::core::transaction::OutputRef;
use crate::core::validator::{check_transaction, TxContext};
use std::collections::HashSet;

/// Validate `block` as the next block of `ledger`
pub fn validate_block(
    block: &Block,
    ledger: &Ledger,
    params: &ConsensusParams,
) -> Result<(), ValidationError> {
    let coinbase = match block.transactions.first() {
        Some(tx) => tx,
        None => {
            return Err(ValidationError::Malformed(format!(
                "block {} has no transactions",
                block.height
            )))
        }
    };

    let expected_height = ledger.height() + 1;
    if block.height != expected_height {
        return Err(ValidationError::HeightMismatch {
            expected: expected_height,
            actual: block.height,
        });
    }

    let count = block.regular_transactions().len();
    if count < params.tx_minimum || count > params.tx_maximum {
        return Err(ValidationError::TxCountOutOfRange {
            count,
            min: params.tx_minimum,
            max: params.tx_maximum,
        });
    }

    if !coinbase.is_well_formed_coinbase() {
        return Err(ValidationError::MissingCoinbase);
    }
    coinbase.check_structure()?;

    let mut block_spent: HashSet<OutputRef> = HashSet::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();
    seen_ids.insert(coinbase.tx_id.as_str());
    let mut fees: u64 = 0;

    for tx in block.regular_transactions() {
        if tx.is_coinbase() {
            return Err(ValidationError::Malformed(format!(
                "coinbase {} outside the first position",
                tx.tx_id
            )));
        }
        if !seen_ids.insert(tx.tx_id.as_str()) {
            return Err(ValidationError::Malformed(format!(
                "transaction {} appears twice in block {}",
                tx.tx_id, block.height
            )));
        }

        let amounts = check_transaction(tx, &TxContext::in_block(ledger, &block_spent))?;
        block_spent.extend(tx.spent_outputs());
        fees = fees.checked_add(amounts.fee()).ok_or_else(|| {
            ValidationError::Malformed(format!("fee total of block {} overflows", block.height))
        })?;
    }

    let expected = params.block_reward.checked_add(fees).ok_or_else(|| {
        ValidationError::Malformed(format!("coinbase value of block {} overflows", block.height))
    })?;
    let actual = coinbase.outputs[0].value;
    if actual != expected {
        return Err(ValidationError::BadCoinbaseValue { expected, actual });
    }

    if block.header != ledger.tip_hash() {
        return Err(ValidationError::BadPreviousHash {
            expected: ledger.tip_hash().to_string(),
            actual: block.header.clone(),
        });
    }

    let hash = block.hash()?;
    if !crate::crypto::meets_difficulty(&hash, params.difficulty) {
        return Err(ValidationError::InvalidProofOfWork {
            hash,
            difficulty: params.difficulty,
        });
    }

    log::debug!(
        "Block {} valid: {} transactions, fees {}",
        block.height,
        block.tx_count(),
        fees
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{Transaction, TxOutput};
    use crate::crypto::KeyPair;
    use crate::test_utils::{candidate_block, funded_ledger, params, solve, spend};

    #[test]
    fn test_empty_block_is_malformed() {
        let ledger = Ledger::new().unwrap();
        let block = Block::new(ledger.tip_hash().to_string(), 1, vec![]);
        assert!(matches!(
            validate_block(&block, &ledger, &params(1)),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_coinbase_only_block_accepted() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate();
        let block = candidate_block(&ledger, &miner, 1000, vec![], 1);
        assert_eq!(validate_block(&block, &ledger, &params(1)), Ok(()));
    }

    #[test]
    fn test_height_mismatch() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate();
        let mut block = candidate_block(&ledger, &miner, 1000, vec![], 0);
        block.height = 2;
        assert_eq!(
            validate_block(&block, &ledger, &params(0)),
            Err(ValidationError::HeightMismatch {
                expected: 1,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_tx_count_bounds() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate();
        let block = candidate_block(&ledger, &miner, 1000, vec![], 0);
        let strict = ConsensusParams {
            tx_minimum: 1,
            ..params(0)
        };
        assert_eq!(
            validate_block(&block, &ledger, &strict),
            Err(ValidationError::TxCountOutOfRange {
                count: 0,
                min: 1,
                max: 10,
            })
        );
    }

    #[test]
    fn test_too_many_transactions() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate();
        let txs = vec![Transaction::template(), Transaction::template()];
        let block = candidate_block(&ledger, &miner, 1000, txs, 0);
        let narrow = ConsensusParams {
            tx_maximum: 1,
            ..params(0)
        };
        assert_eq!(
            validate_block(&block, &ledger, &narrow),
            Err(ValidationError::TxCountOutOfRange {
                count: 2,
                min: 0,
                max: 1,
            })
        );
    }

    #[test]
    fn test_missing_coinbase() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let tx = spend(&alice, OutputRef::new(1, 0, 0), &[(alice.public_key_bytes(), 100)]);

        let mut block = Block::new(ledger.tip_hash().to_string(), 2, vec![tx.clone(), tx]);
        solve(&mut block, 0);
        assert_eq!(
            validate_block(&block, &ledger, &params(0)),
            Err(ValidationError::MissingCoinbase)
        );
    }

    #[test]
    fn test_coinbase_accounting() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let miner = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        // Fee of 15
        let tx = spend(&alice, OutputRef::new(1, 0, 0), &[(bob.public_key_bytes(), 85)]);

        for wrong in [1014, 1016, 1000] {
            let block = candidate_block(&ledger, &miner, wrong, vec![tx.clone()], 1);
            assert_eq!(
                validate_block(&block, &ledger, &params(1)),
                Err(ValidationError::BadCoinbaseValue {
                    expected: 1015,
                    actual: wrong,
                })
            );
        }

        let block = candidate_block(&ledger, &miner, 1015, vec![tx], 1);
        assert_eq!(validate_block(&block, &ledger, &params(1)), Ok(()));
    }

    #[test]
    fn test_same_output_twice_in_block() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let outpoint = OutputRef::new(1, 0, 0);
        let first = spend(&alice, outpoint, &[(alice.public_key_bytes(), 100)]);
        let second = spend(&alice, outpoint, &[(alice.public_key_bytes(), 90)]);

        let block = candidate_block(&ledger, &KeyPair::generate(), 1000, vec![first, second], 0);
        assert_eq!(
            validate_block(&block, &ledger, &params(0)),
            Err(ValidationError::DoubleSpendConfirmed(outpoint))
        );
    }

    #[test]
    fn test_duplicate_tx_and_stray_coinbase_are_malformed() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let miner = KeyPair::generate();
        let tx = spend(&alice, OutputRef::new(1, 0, 0), &[(alice.public_key_bytes(), 100)]);

        let duplicated = candidate_block(&ledger, &miner, 1000, vec![tx.clone(), tx], 0);
        assert!(matches!(
            validate_block(&duplicated, &ledger, &params(0)),
            Err(ValidationError::Malformed(_))
        ));

        let stray = Transaction::coinbase(miner.public_key_bytes(), 5);
        let with_stray = candidate_block(&ledger, &miner, 1000, vec![stray], 0);
        assert!(matches!(
            validate_block(&with_stray, &ledger, &params(0)),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_bad_previous_hash() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate();
        let mut block = candidate_block(&ledger, &miner, 1000, vec![], 0);
        block.header = "ab".repeat(32);
        assert_eq!(
            validate_block(&block, &ledger, &params(0)),
            Err(ValidationError::BadPreviousHash {
                expected: ledger.tip_hash().to_string(),
                actual: "ab".repeat(32),
            })
        );
    }

    #[test]
    fn test_proof_of_work_gate() {
        let ledger = Ledger::new().unwrap();
        let miner = KeyPair::generate();
        let mut block = Block::new(
            ledger.tip_hash().to_string(),
            1,
            vec![Transaction::coinbase(miner.public_key_bytes(), 1000)],
        );

        // Find a nonce whose hash misses the target
        while block.meets_difficulty(2).unwrap() {
            block.nonce += 1;
        }
        assert!(matches!(
            validate_block(&block, &ledger, &params(2)),
            Err(ValidationError::InvalidProofOfWork { difficulty: 2, .. })
        ));

        solve(&mut block, 2);
        assert!(block.hash().unwrap().starts_with("00"));
        assert_eq!(validate_block(&block, &ledger, &params(2)), Ok(()));
    }

    #[test]
    fn test_invalid_transaction_rejects_block() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let mut tx = spend(&alice, OutputRef::new(1, 0, 0), &[(alice.public_key_bytes(), 50)]);
        tx.outputs.push(TxOutput::new(60, alice.public_key_bytes()));

        let block = candidate_block(&ledger, &KeyPair::generate(), 1000, vec![tx], 0);
        // Outputs were changed after signing, but the balance rule fires first
        assert_eq!(
            validate_block(&block, &ledger, &params(0)),
            Err(ValidationError::InsufficientInput {
                input_sum: 100,
                output_sum: 110,
            })
        );
    }
}
