//! Persistence backend contract
//!
//! The node needs two durable things: the append-only block sequence and
//! the current set of pending transactions. Any medium that can provide
//! both can back a node.

use crate::core::{Block, Transaction};
use parking_lot::Mutex;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt data: {0}")]
    Corrupt(String),
}

/// Durable store for the ledger and the pending pool
pub trait Backend: Send + Sync {
    /// All committed blocks in height order; empty for a fresh store
    fn load_blocks(&self) -> Result<Vec<Block>, StorageError>;

    /// Durably append one block after the last stored one.
    ///
    /// Either the whole block is stored or, on error, nothing is.
    fn append_block(&self, block: &Block) -> Result<(), StorageError>;

    /// Pending transactions in arrival order
    fn load_pending(&self) -> Result<Vec<Transaction>, StorageError>;

    /// Replace the stored pending set
    fn store_pending(&self, pending: &[Transaction]) -> Result<(), StorageError>;
}

/// Volatile backend, for tests and throwaway nodes
#[derive(Debug, Default)]
pub struct MemoryBackend {
    blocks: Mutex<Vec<Block>>,
    pending: Mutex<Vec<Transaction>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn load_blocks(&self) -> Result<Vec<Block>, StorageError> {
        Ok(self.blocks.lock().clone())
    }

    fn append_block(&self, block: &Block) -> Result<(), StorageError> {
        self.blocks.lock().push(block.clone());
        Ok(())
    }

    fn load_pending(&self) -> Result<Vec<Transaction>, StorageError> {
        Ok(self.pending.lock().clone())
    }

    fn store_pending(&self, pending: &[Transaction]) -> Result<(), StorageError> {
        *self.pending.lock() = pending.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.load_blocks().unwrap().is_empty());

        backend.append_block(&Block::genesis()).unwrap();
        assert_eq!(backend.load_blocks().unwrap(), vec![Block::genesis()]);

        let tx = Transaction::template();
        backend.store_pending(&[tx.clone()]).unwrap();
        assert_eq!(backend.load_pending().unwrap(), vec![tx]);
        backend.store_pending(&[]).unwrap();
        assert!(backend.load_pending().unwrap().is_empty());
    }
}
