//! Shared test fixtures

use crate::config::ConsensusParams;
use crate::core::{Block, Ledger, OutputRef, Transaction, TxInput, TxOutput};
use crate::crypto::KeyPair;

/// Default parameters with the given difficulty
pub fn params(difficulty: u32) -> ConsensusParams {
    ConsensusParams {
        difficulty,
        ..ConsensusParams::default()
    }
}

/// Brute-force a nonce meeting `difficulty`
pub fn solve(block: &mut Block, difficulty: u32) {
    while !block.meets_difficulty(difficulty).unwrap() {
        block.nonce += 1;
    }
}

/// Solved block on top of `header` paying `coinbase_value` to `miner`
pub fn mine_on(
    header: &str,
    height: u64,
    miner: &KeyPair,
    coinbase_value: u64,
    txs: Vec<Transaction>,
    difficulty: u32,
) -> Block {
    let mut transactions = vec![Transaction::coinbase(miner.public_key_bytes(), coinbase_value)];
    transactions.extend(txs);
    let mut block = Block::new(header.to_string(), height, transactions);
    solve(&mut block, difficulty);
    block
}

/// Solved block extending `ledger`
pub fn candidate_block(
    ledger: &Ledger,
    miner: &KeyPair,
    coinbase_value: u64,
    txs: Vec<Transaction>,
    difficulty: u32,
) -> Block {
    mine_on(
        ledger.tip_hash(),
        ledger.height() + 1,
        miner,
        coinbase_value,
        txs,
        difficulty,
    )
}

/// Signed transaction spending `outpoint` owned by `owner`
pub fn spend(owner: &KeyPair, outpoint: OutputRef, outputs: &[(Vec<u8>, u64)]) -> Transaction {
    let mut tx = Transaction::new(
        vec![TxInput::spending(outpoint)],
        outputs
            .iter()
            .map(|(pk, value)| TxOutput::new(*value, pk.clone()))
            .collect(),
    );
    tx.sign(owner).unwrap();
    tx
}

/// Ledger whose block 1 coinbase pays `value` to `owner`, at output (1, 0, 0)
pub fn funded_ledger(owner: &KeyPair, value: u64) -> Ledger {
    let mut ledger = Ledger::new().unwrap();
    let block = candidate_block(&ledger, owner, value, vec![], 0);
    ledger.append(block).unwrap();
    ledger
}
