//! Transaction pool (mempool) for pending transactions
//!
//! Holds transactions admitted but not yet committed, keyed by `tx_id` and
//! kept in arrival order. A claims index maps every output referenced by a
//! pooled transaction to the transaction that claims it, so pending
//! double-spends are found without scanning the pool.

use crate::core::validator::{validate_transaction, TxContext};
use crate::core::{Block, Ledger, OutputRef, Transaction, ValidationError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

// =============================================================================
// Mempool Entry
// =============================================================================

/// Entry in the mempool with metadata
#[derive(Debug, Clone)]
pub struct MempoolEntry {
    /// The transaction
    pub tx: Transaction,
    /// When the transaction was added (Unix timestamp)
    pub added_time: u64,
}

impl MempoolEntry {
    pub fn new(tx: Transaction) -> Self {
        Self {
            tx,
            added_time: chrono::Utc::now().timestamp().max(0) as u64,
        }
    }
}

// =============================================================================
// Mempool
// =============================================================================

/// Memory pool for pending transactions
#[derive(Debug, Default)]
pub struct Mempool {
    /// Transactions indexed by ID
    entries: HashMap<String, MempoolEntry>,
    /// Transaction IDs in order of arrival
    by_time: Vec<String>,
    /// Claimed output -> id of the pooled transaction spending it
    claims: HashMap<OutputRef, String>,
}

impl Mempool {
    /// Create an empty mempool
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `tx` against the ledger and this pool, then admit it.
    ///
    /// Nothing changes on failure. Coinbase transactions are only valid as
    /// the first transaction of a block and are never pooled.
    pub fn submit(&mut self, tx: Transaction, ledger: &Ledger) -> Result<(), ValidationError> {
        if tx.is_coinbase() {
            return Err(ValidationError::Malformed(format!(
                "coinbase {} cannot be submitted as a pending transaction",
                tx.tx_id
            )));
        }

        validate_transaction(&tx, &TxContext::pending(ledger, self))?;

        if self.entries.contains_key(&tx.tx_id) {
            return Err(ValidationError::DuplicateTx(tx.tx_id));
        }

        self.insert(tx);
        Ok(())
    }

    fn insert(&mut self, tx: Transaction) {
        let tx_id = tx.tx_id.clone();
        for outpoint in tx.spent_outputs() {
            self.claims.insert(outpoint, tx_id.clone());
        }
        self.by_time.push(tx_id.clone());
        self.entries.insert(tx_id, MempoolEntry::new(tx));
    }

    /// Drop everything `block` made obsolete.
    ///
    /// Removes transactions included in the block and any remaining one that
    /// spends an output the block consumed. Returns the evicted ids.
    pub fn on_block_committed(&mut self, block: &Block) -> Vec<String> {
        let consumed: HashSet<OutputRef> = block
            .transactions
            .iter()
            .flat_map(|tx| tx.spent_outputs())
            .collect();

        let mut evicted: Vec<String> = block
            .transactions
            .iter()
            .filter(|tx| self.entries.contains_key(&tx.tx_id))
            .map(|tx| tx.tx_id.clone())
            .collect();

        for outpoint in &consumed {
            if let Some(claimant) = self.claims.get(outpoint) {
                if !evicted.contains(claimant) {
                    evicted.push(claimant.clone());
                }
            }
        }

        for tx_id in &evicted {
            self.remove(tx_id);
        }
        if !evicted.is_empty() {
            log::debug!(
                "Evicted {} pending transactions after block {}",
                evicted.len(),
                block.height
            );
        }
        evicted
    }

    /// Remove a transaction from the pool
    pub fn remove(&mut self, tx_id: &str) -> Option<Transaction> {
        let entry = self.entries.remove(tx_id)?;
        self.by_time.retain(|id| id != tx_id);
        for outpoint in entry.tx.spent_outputs() {
            if self.claims.get(&outpoint).map(String::as_str) == Some(tx_id) {
                self.claims.remove(&outpoint);
            }
        }
        Some(entry.tx)
    }

    /// Pending transactions in arrival order
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.by_time
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| e.tx.clone()))
            .collect()
    }

    /// Iterate pending transactions in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.by_time
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| &e.tx))
    }

    /// Id of the pooled transaction spending `outpoint`, if any
    pub fn claimant(&self, outpoint: &OutputRef) -> Option<&str> {
        self.claims.get(outpoint).map(String::as_str)
    }

    /// Get a transaction by ID
    pub fn get(&self, tx_id: &str) -> Option<&Transaction> {
        self.entries.get(tx_id).map(|e| &e.tx)
    }

    /// Get a mempool entry by ID
    pub fn get_entry(&self, tx_id: &str) -> Option<&MempoolEntry> {
        self.entries.get(tx_id)
    }

    /// Check if a transaction is in the pool
    pub fn contains(&self, tx_id: &str) -> bool {
        self.entries.contains_key(tx_id)
    }

    /// Get the number of pending transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get mempool statistics
    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            tx_count: self.entries.len(),
            claimed_outputs: self.claims.len(),
            total_output: self
                .entries
                .values()
                .filter_map(|e| e.tx.total_output())
                .fold(0u64, u64::saturating_add),
        }
    }
}

/// Mempool statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MempoolStats {
    pub tx_count: usize,
    pub claimed_outputs: usize,
    pub total_output: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::test_utils::{funded_ledger, spend};

    #[test]
    fn test_submit_and_snapshot() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let mut pool = Mempool::new();

        let tx = spend(&alice, OutputRef::new(1, 0, 0), &[(bob.public_key_bytes(), 100)]);
        pool.submit(tx.clone(), &ledger).unwrap();

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&tx.tx_id));
        assert_eq!(pool.claimant(&OutputRef::new(1, 0, 0)), Some(tx.tx_id.as_str()));
        assert_eq!(pool.snapshot(), vec![tx]);
        assert_eq!(pool.stats().total_output, 100);
    }

    #[test]
    fn test_duplicate_submission() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let mut pool = Mempool::new();

        let tx = spend(&alice, OutputRef::new(1, 0, 0), &[(alice.public_key_bytes(), 90)]);
        assert_eq!(pool.submit(tx.clone(), &ledger), Ok(()));
        assert_eq!(
            pool.submit(tx.clone(), &ledger),
            Err(ValidationError::DuplicateTx(tx.tx_id.clone()))
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_pending_double_spend() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let mut pool = Mempool::new();
        let outpoint = OutputRef::new(1, 0, 0);

        let first = spend(&alice, outpoint, &[(alice.public_key_bytes(), 90)]);
        let second = spend(&alice, outpoint, &[(alice.public_key_bytes(), 80)]);
        pool.submit(first.clone(), &ledger).unwrap();

        assert_eq!(
            pool.submit(second, &ledger),
            Err(ValidationError::DoubleSpendPending(outpoint, first.tx_id))
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_coinbase_rejected() {
        let ledger = Ledger::new().unwrap();
        let mut pool = Mempool::new();
        let coinbase = Transaction::coinbase(vec![1; 33], 1000);
        assert!(matches!(
            pool.submit(coinbase, &ledger),
            Err(ValidationError::Malformed(_))
        ));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_block_commit_evicts_included_and_conflicting() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let mut pool = Mempool::new();
        let outpoint = OutputRef::new(1, 0, 0);

        let pooled = spend(&alice, outpoint, &[(alice.public_key_bytes(), 90)]);
        pool.submit(pooled.clone(), &ledger).unwrap();

        // A different transaction spending the same output gets mined
        let mined = spend(&alice, outpoint, &[(alice.public_key_bytes(), 95)]);
        let block = Block::new(
            ledger.tip_hash().to_string(),
            2,
            vec![Transaction::coinbase(vec![7; 33], 1005), mined],
        );

        assert_eq!(pool.on_block_committed(&block), vec![pooled.tx_id.clone()]);
        assert!(pool.is_empty());
        assert!(pool.claimant(&outpoint).is_none());

        // Nothing left to evict
        assert!(pool.on_block_committed(&block).is_empty());
    }

    #[test]
    fn test_remove() {
        let alice = KeyPair::generate();
        let ledger = funded_ledger(&alice, 100);
        let mut pool = Mempool::new();

        let tx = spend(&alice, OutputRef::new(1, 0, 0), &[(alice.public_key_bytes(), 90)]);
        pool.submit(tx.clone(), &ledger).unwrap();

        assert_eq!(pool.remove(&tx.tx_id), Some(tx.clone()));
        assert!(pool.remove(&tx.tx_id).is_none());
        assert!(pool.claimant(&OutputRef::new(1, 0, 0)).is_none());
        assert!(pool.snapshot().is_empty());
    }
}
