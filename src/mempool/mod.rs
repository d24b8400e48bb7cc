//! Pending transaction pool

pub mod pool;

pub use pool::{Mempool, MempoolEntry, MempoolStats};
