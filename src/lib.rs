//! Ledger-Node: a validating UTXO ledger node in Rust
//!
//! This crate provides the consensus core of a small proof-of-work ledger:
//! - Canonical JSON encoding and SHA-256 hashing of every record
//! - ECDSA signatures (secp256k1) over transactions
//! - UTXO transaction model with fee accounting
//! - Block validation (height, size bounds, coinbase value, linkage, work)
//! - Pending transaction pool with double-spend protection
//! - Append-only JSON-lines persistence
//! - REST API and CLI over a thread-safe node
//!
//! # Example
//!
//! ```rust
//! use ledger_node::config::ConsensusParams;
//! use ledger_node::core::Block;
//! use ledger_node::crypto::KeyPair;
//! use ledger_node::node::Node;
//! use ledger_node::core::Transaction;
//!
//! let params = ConsensusParams { difficulty: 1, ..Default::default() };
//! let node = Node::in_memory(params).unwrap();
//!
//! // Assemble and solve a block paying the reward to a fresh key
//! let miner = KeyPair::generate();
//! let (height, tip) = node.tip();
//! let coinbase = Transaction::coinbase(miner.public_key_bytes(), params.block_reward);
//! let mut block = Block::new(tip, height + 1, vec![coinbase]);
//! while !block.meets_difficulty(params.difficulty).unwrap() {
//!     block.nonce += 1;
//! }
//! node.submit_block(block).unwrap();
//!
//! let utxos = node.get_utxo(&miner.public_key_bytes(), false);
//! assert_eq!(utxos.total, params.block_reward);
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod mempool;
pub mod node;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use config::{ConsensusParams, NodeConfig};
pub use core::{Block, Ledger, Transaction, ValidationError};
pub use crypto::KeyPair;
pub use mempool::Mempool;
pub use node::{Node, NodeError};
pub use storage::{Backend, FileBackend, MemoryBackend};
