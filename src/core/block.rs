//! Block records
//!
//! A block links to its predecessor through `header`, the canonical hash of
//! the previous block, and carries a nonce proving work over its own hash.

use crate::core::codec::{self, CodecError};
use crate::core::transaction::Transaction;
use crate::crypto::meets_difficulty;
use serde::{Deserialize, Serialize};

/// A block in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    /// Canonical hash of the previous block, empty for genesis
    pub header: String,
    /// Position in the ledger, genesis is 0
    pub height: u64,
    /// Unix timestamp in seconds
    pub timestamp: u64,
    /// Coinbase first, then ordinary transactions
    pub transactions: Vec<Transaction>,
    /// Proof-of-work nonce
    pub nonce: u64,
}

impl Block {
    /// Create a new block (not yet solved)
    pub fn new(header: String, height: u64, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            height,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            transactions,
            nonce: 0,
        }
    }

    /// The genesis block: no transactions, height 0, zero nonce
    pub fn genesis() -> Self {
        Self {
            header: String::new(),
            height: 0,
            timestamp: 0,
            transactions: Vec::new(),
            nonce: 0,
        }
    }

    /// Zero-valued block skeleton
    pub fn template() -> Self {
        Self {
            transactions: vec![Transaction::coinbase_template()],
            ..Self::genesis()
        }
    }

    /// Canonical hash of the whole block, nonce included
    pub fn hash(&self) -> Result<String, CodecError> {
        codec::hash_hex(self)
    }

    /// Check if the block hash has `difficulty` leading zero hex digits
    pub fn meets_difficulty(&self, difficulty: u32) -> Result<bool, CodecError> {
        Ok(meets_difficulty(&self.hash()?, difficulty))
    }

    /// Get the coinbase transaction (first transaction)
    pub fn coinbase_tx(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }

    /// Transactions after the coinbase
    pub fn regular_transactions(&self) -> &[Transaction] {
        self.transactions.get(1..).unwrap_or(&[])
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Check whether a transaction with the given id is in this block
    pub fn contains_tx(&self, tx_id: &str) -> bool {
        self.transactions.iter().any(|tx| tx.tx_id == tx_id)
    }
}
