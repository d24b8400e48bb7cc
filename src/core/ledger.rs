//! Ledger store
//!
//! The append-only sequence of committed blocks, with lookup by height and
//! by hash. Alongside the blocks it keeps two derived indexes, rebuilt on
//! load and extended on every append: block hashes, and the set of
//! committed outputs already consumed by some input.

use crate::core::block::Block;
use crate::core::codec::CodecError;
use crate::core::transaction::{OutputRef, TxOutput};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised when a block sequence cannot form a ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger must start with the genesis block")]
    BadGenesis,
    #[error("Block at position {position} has height {height}")]
    HeightGap { position: u64, height: u64 },
    #[error("Block {height} does not link to its predecessor")]
    BrokenLink { height: u64 },
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// The committed chain of blocks
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    /// Canonical hash of each block, indexed by height
    hashes: Vec<String>,
    by_hash: HashMap<String, u64>,
    /// Consumed output -> id of the committed transaction that consumed it
    spent: HashMap<OutputRef, String>,
}

impl Ledger {
    /// Create a ledger holding only the genesis block
    pub fn new() -> Result<Self, LedgerError> {
        Self::from_blocks(vec![Block::genesis()])
    }

    /// Rebuild a ledger from a stored block sequence.
    ///
    /// Checks that the sequence starts at genesis, that heights are
    /// consecutive and that every header matches the previous block hash.
    /// Transactions are not re-validated.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, LedgerError> {
        let mut iter = blocks.into_iter();
        let genesis = iter.next().ok_or(LedgerError::BadGenesis)?;
        if genesis != Block::genesis() {
            return Err(LedgerError::BadGenesis);
        }

        let mut ledger = Self {
            blocks: Vec::new(),
            hashes: Vec::new(),
            by_hash: HashMap::new(),
            spent: HashMap::new(),
        };
        ledger.push(genesis)?;

        for block in iter {
            ledger.append(block)?;
        }
        Ok(ledger)
    }

    /// Append a block that has already passed block validation.
    ///
    /// Height and linkage are re-checked so a caller bug can never corrupt
    /// the sequence.
    pub fn append(&mut self, block: Block) -> Result<(), LedgerError> {
        let position = self.blocks.len() as u64;
        if block.height != position {
            return Err(LedgerError::HeightGap {
                position,
                height: block.height,
            });
        }
        if block.header != self.tip_hash() {
            return Err(LedgerError::BrokenLink {
                height: block.height,
            });
        }
        self.push(block)
    }

    fn push(&mut self, block: Block) -> Result<(), LedgerError> {
        let hash = block.hash()?;
        for tx in &block.transactions {
            for outpoint in tx.spent_outputs() {
                self.spent.insert(outpoint, tx.tx_id.clone());
            }
        }
        self.by_hash.insert(hash.clone(), block.height);
        self.hashes.push(hash);
        self.blocks.push(block);
        Ok(())
    }

    /// Get the latest block
    pub fn tip(&self) -> &Block {
        // `from_blocks` guarantees genesis is present
        &self.blocks[self.blocks.len() - 1]
    }

    /// Canonical hash of the latest block
    pub fn tip_hash(&self) -> &str {
        &self.hashes[self.hashes.len() - 1]
    }

    /// Height of the latest block
    pub fn height(&self) -> u64 {
        self.tip().height
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// A ledger always holds genesis, so it is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Get a block by height
    pub fn get(&self, height: u64) -> Option<&Block> {
        usize::try_from(height)
            .ok()
            .and_then(|index| self.blocks.get(index))
    }

    /// Get a block by its canonical hash
    pub fn get_by_hash(&self, hash: &str) -> Option<&Block> {
        self.by_hash.get(hash).and_then(|height| self.get(*height))
    }

    /// Canonical hash of the block at `height`
    pub fn hash_at(&self, height: u64) -> Option<&str> {
        usize::try_from(height)
            .ok()
            .and_then(|index| self.hashes.get(index))
            .map(String::as_str)
    }

    /// All committed blocks in order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Resolve an output reference against committed blocks
    pub fn resolve_output(&self, outpoint: &OutputRef) -> Option<&TxOutput> {
        self.get(outpoint.block_height)?
            .transactions
            .get(outpoint.tx_index as usize)?
            .outputs
            .get(outpoint.output_index as usize)
    }

    /// Id of the committed transaction that consumed `outpoint`, if any
    pub fn spender_of(&self, outpoint: &OutputRef) -> Option<&str> {
        self.spent.get(outpoint).map(String::as_str)
    }

    /// Whether a committed transaction already consumed `outpoint`
    pub fn is_spent(&self, outpoint: &OutputRef) -> bool {
        self.spent.contains_key(outpoint)
    }

    /// Get chain statistics
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.height(),
            total_blocks: self.blocks.len() as u64,
            total_transactions: self.blocks.iter().map(|b| b.transactions.len() as u64).sum(),
            latest_hash: self.tip_hash().to_string(),
        }
    }
}

/// Chain statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChainStats {
    pub height: u64,
    pub total_blocks: u64,
    pub total_transactions: u64,
    pub latest_hash: String,
}
