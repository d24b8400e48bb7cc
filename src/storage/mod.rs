//! Storage module for ledger persistence

pub mod backend;
pub mod persistence;

pub use backend::{Backend, MemoryBackend, StorageError};
pub use persistence::{FileBackend, BLOCKS_FILE, MEMPOOL_FILE};
