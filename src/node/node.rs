//! Ledger node
//!
//! The node owns the committed ledger and the pending pool, each behind its
//! own read-write lock. Locks are always taken ledger first, then mempool,
//! and every mutation holds its locks from validation through persistence,
//! so concurrent callers never see a half-applied operation and two
//! transactions can never both claim the same output.

use crate::config::{ConfigError, ConsensusParams};
use crate::core::{
    collect_utxos, validate_block, Block, ChainStats, Ledger, LedgerError, Transaction, UtxoSet,
    ValidationError,
};
use crate::mempool::{Mempool, MempoolStats};
use crate::storage::{Backend, MemoryBackend, StorageError};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Node errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Rejected: {0}")]
    Rejected(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl NodeError {
    /// The validation failure, if this is a rejection
    pub fn rejection(&self) -> Option<&ValidationError> {
        match self {
            NodeError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

/// Snapshot of node state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub chain: ChainStats,
    pub mempool: MempoolStats,
    pub params: ConsensusParams,
}

/// Validating ledger node
pub struct Node {
    ledger: RwLock<Ledger>,
    mempool: RwLock<Mempool>,
    params: ConsensusParams,
    backend: Arc<dyn Backend>,
}

impl Node {
    /// Open a node over `backend`.
    ///
    /// An empty store is initialized with the genesis block. Stored pending
    /// transactions are re-validated against the loaded ledger and invalid
    /// ones are dropped.
    pub fn open(params: ConsensusParams, backend: Arc<dyn Backend>) -> Result<Self, NodeError> {
        params.validate()?;

        let blocks = backend.load_blocks()?;
        let ledger = if blocks.is_empty() {
            let ledger = Ledger::new()?;
            backend.append_block(ledger.tip())?;
            log::info!("Initialized new ledger with genesis block");
            ledger
        } else {
            Ledger::from_blocks(blocks)
                .map_err(|e| StorageError::Corrupt(format!("stored chain is invalid: {}", e)))?
        };

        let stored = backend.load_pending()?;
        let stored_count = stored.len();
        let mut mempool = Mempool::new();
        for tx in stored {
            let tx_id = tx.tx_id.clone();
            if let Err(e) = mempool.submit(tx, &ledger) {
                log::warn!("Dropping stored pending transaction {}: {}", tx_id, e);
            }
        }
        if mempool.len() != stored_count {
            backend.store_pending(&mempool.snapshot())?;
        }

        log::info!(
            "Ledger loaded: height {}, tip {}, {} pending transactions",
            ledger.height(),
            ledger.tip_hash(),
            mempool.len()
        );

        Ok(Self {
            ledger: RwLock::new(ledger),
            mempool: RwLock::new(mempool),
            params,
            backend,
        })
    }

    /// Open a node that keeps everything in memory
    pub fn in_memory(params: ConsensusParams) -> Result<Self, NodeError> {
        Self::open(params, Arc::new(MemoryBackend::new()))
    }

    // =========================================================================
    // Submissions
    // =========================================================================

    /// Validate and admit a pending transaction
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), NodeError> {
        let ledger = self.ledger.read();
        let mut mempool = self.mempool.write();

        let tx_id = tx.tx_id.clone();
        if let Err(e) = mempool.submit(tx, &ledger) {
            log::warn!("Rejected transaction {}: {}", tx_id, e);
            return Err(e.into());
        }

        if let Err(e) = self.backend.store_pending(&mempool.snapshot()) {
            mempool.remove(&tx_id);
            log::warn!("Could not persist transaction {}: {}", tx_id, e);
            return Err(e.into());
        }

        log::info!("Accepted transaction {} ({} pending)", tx_id, mempool.len());
        Ok(())
    }

    /// Validate and commit a block, then evict what it made obsolete
    pub fn submit_block(&self, block: Block) -> Result<(), NodeError> {
        let mut ledger = self.ledger.write();
        let mut mempool = self.mempool.write();

        if let Err(e) = validate_block(&block, &ledger, &self.params) {
            log::warn!("Rejected block {}: {}", block.height, e);
            return Err(e.into());
        }

        self.backend.append_block(&block)?;
        ledger.append(block)?;

        let committed = ledger.tip();
        let evicted = mempool.on_block_committed(committed);
        if !evicted.is_empty() {
            if let Err(e) = self.backend.store_pending(&mempool.snapshot()) {
                // Stale entries are dropped by re-validation on the next start
                log::warn!("Could not persist mempool after block {}: {}", committed.height, e);
            }
        }

        log::info!(
            "Committed block {} ({} transactions), hash {}",
            committed.height,
            committed.tx_count(),
            ledger.tip_hash()
        );
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Unspent outputs addressed to `pk`
    pub fn get_utxo(&self, pk: &[u8], include_pending: bool) -> UtxoSet {
        let ledger = self.ledger.read();
        if include_pending {
            let mempool = self.mempool.read();
            collect_utxos(pk, ledger.blocks(), mempool.iter())
        } else {
            collect_utxos(pk, ledger.blocks(), std::iter::empty())
        }
    }

    /// All committed blocks in order
    pub fn get_chain(&self) -> Vec<Block> {
        self.ledger.read().blocks().to_vec()
    }

    /// Committed block at `height`
    pub fn get_block(&self, height: u64) -> Option<Block> {
        self.ledger.read().get(height).cloned()
    }

    /// Committed block with canonical hash `hash`
    pub fn get_block_by_hash(&self, hash: &str) -> Option<Block> {
        self.ledger.read().get_by_hash(hash).cloned()
    }

    /// Height and hash of the latest block
    pub fn tip(&self) -> (u64, String) {
        let ledger = self.ledger.read();
        (ledger.height(), ledger.tip_hash().to_string())
    }

    /// Pending transactions in arrival order
    pub fn get_mempool(&self) -> Vec<Transaction> {
        self.mempool.read().snapshot()
    }

    /// Pending transaction with id `tx_id`
    pub fn get_pending_transaction(&self, tx_id: &str) -> Option<Transaction> {
        self.mempool.read().get(tx_id).cloned()
    }

    /// Consensus parameters
    pub fn get_parameters(&self) -> ConsensusParams {
        self.params
    }

    /// Chain and pool summary
    pub fn status(&self) -> NodeStatus {
        let ledger = self.ledger.read();
        let mempool = self.mempool.read();
        NodeStatus {
            chain: ledger.stats(),
            mempool: mempool.stats(),
            params: self.params,
        }
    }

    pub fn get_block_template(&self) -> Block {
        Block::template()
    }

    pub fn get_transaction_template(&self) -> Transaction {
        Transaction::template()
    }

    pub fn get_coinbase_template(&self) -> Transaction {
        Transaction::coinbase_template()
    }
}
