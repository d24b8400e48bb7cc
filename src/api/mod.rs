//! REST API module
//!
//! Thin HTTP layer over [`crate::node::Node`]. Bodies and responses use the
//! canonical JSON record shapes; rejections come back as `400` with the
//! failed rule in `kind`, storage failures as `500`.
//!
//! # Endpoints
//!
//! ## Chain
//! - `GET /api/chain` - All committed blocks
//! - `GET /api/chain/blocks/{height}` - Get block by height
//! - `GET /api/chain/hash/{hash}` - Get block by hash
//! - `POST /api/chain/submit` - Submit a solved block
//! - `GET /api/status` - Chain and mempool summary
//!
//! ## Transactions
//! - `GET /api/mempool` - List pending transactions
//! - `POST /api/tx/submit` - Submit a signed transaction
//! - `GET /api/tx/{id}` - Get a pending transaction
//! - `GET /api/utxo/{pk}?include_pending=bool` - Unspent outputs of a key
//!
//! ## Parameters
//! - `GET /api/params` - Consensus parameters
//! - `GET /api/template/{block|tx|coinbase}` - Zero-valued record skeletons

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::{create_router, serve};
