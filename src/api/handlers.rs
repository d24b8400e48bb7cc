//! REST API handlers for ledger operations

use crate::config::ConsensusParams;
use crate::core::{Block, Transaction, UtxoSet, ValidationError};
use crate::node::{Node, NodeError, NodeStatus};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub node: Arc<Node>,
}

impl ApiState {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    pub id: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, kind: &str, error: String) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error,
            kind: kind.to_string(),
        }),
    )
}

fn rejected(err: ValidationError) -> (StatusCode, Json<ApiError>) {
    api_error(StatusCode::BAD_REQUEST, err.kind(), err.to_string())
}

fn node_error(err: NodeError) -> (StatusCode, Json<ApiError>) {
    match err {
        NodeError::Rejected(err) => rejected(err),
        other => {
            log::error!("Request failed: {}", other);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage", other.to_string())
        }
    }
}

fn not_found(error: String) -> (StatusCode, Json<ApiError>) {
    api_error(StatusCode::NOT_FOUND, "not_found", error)
}

/// Run a node submission on the blocking pool; it takes the node's locks
/// and verifies signatures
async fn run_blocking<F>(submit: F) -> Result<(), (StatusCode, Json<ApiError>)>
where
    F: FnOnce() -> Result<(), NodeError> + Send + 'static,
{
    tokio::task::spawn_blocking(submit)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string()))?
        .map_err(node_error)
}

/// Decode a JSON body; any shape error is a malformed record
fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, (StatusCode, Json<ApiError>)> {
    serde_json::from_slice(body).map_err(|e| rejected(ValidationError::from(e)))
}

// ============================================================================
// Chain Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/status - Chain and mempool summary
pub async fn get_status(State(state): State<ApiState>) -> Json<NodeStatus> {
    Json(state.node.status())
}

/// GET /api/chain - All committed blocks
pub async fn get_chain(State(state): State<ApiState>) -> Json<Vec<Block>> {
    Json(state.node.get_chain())
}

/// GET /api/chain/blocks/{height}
pub async fn get_block_by_height(
    State(state): State<ApiState>,
    Path(height): Path<u64>,
) -> ApiResult<Block> {
    state
        .node
        .get_block(height)
        .map(Json)
        .ok_or_else(|| not_found(format!("Block at height {} not found", height)))
}

/// GET /api/chain/hash/{hash}
pub async fn get_block_by_hash(
    State(state): State<ApiState>,
    Path(hash): Path<String>,
) -> ApiResult<Block> {
    state
        .node
        .get_block_by_hash(&hash)
        .map(Json)
        .ok_or_else(|| not_found(format!("Block {} not found", hash)))
}

/// POST /api/chain/submit - Submit a solved block
pub async fn submit_block(State(state): State<ApiState>, body: Bytes) -> ApiResult<SubmitResponse> {
    let block: Block = decode(&body)?;
    let id = block.hash().map_err(|e| rejected(e.into()))?;
    let node = state.node.clone();
    run_blocking(move || node.submit_block(block)).await?;
    Ok(Json(SubmitResponse { accepted: true, id }))
}

// ============================================================================
// Transaction Handlers
// ============================================================================

/// GET /api/mempool - Pending transactions
pub async fn get_mempool(State(state): State<ApiState>) -> Json<Vec<Transaction>> {
    Json(state.node.get_mempool())
}

/// POST /api/tx/submit - Submit a signed transaction
pub async fn submit_transaction(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<SubmitResponse> {
    let tx: Transaction = decode(&body)?;
    let id = tx.tx_id.clone();
    let node = state.node.clone();
    run_blocking(move || node.submit_transaction(tx)).await?;
    Ok(Json(SubmitResponse { accepted: true, id }))
}

/// GET /api/tx/{id} - Pending transaction by id
pub async fn get_pending_transaction(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Transaction> {
    state
        .node
        .get_pending_transaction(&id)
        .map(Json)
        .ok_or_else(|| not_found(format!("Transaction {} is not pending", id)))
}

#[derive(Debug, Default, Deserialize)]
pub struct UtxoQuery {
    #[serde(default)]
    pub include_pending: bool,
}

/// GET /api/utxo/{pk}?include_pending=bool
pub async fn get_utxo(
    State(state): State<ApiState>,
    Path(pk): Path<String>,
    Query(query): Query<UtxoQuery>,
) -> ApiResult<UtxoSet> {
    let pk = hex::decode(&pk).map_err(|e| {
        rejected(ValidationError::MalformedKey(format!("public key is not hex: {}", e)))
    })?;
    Ok(Json(state.node.get_utxo(&pk, query.include_pending)))
}

// ============================================================================
// Parameters and Templates
// ============================================================================

/// GET /api/params
pub async fn get_params(State(state): State<ApiState>) -> Json<ConsensusParams> {
    Json(state.node.get_parameters())
}

/// GET /api/template/{block|tx|coinbase}
pub async fn get_template(
    State(state): State<ApiState>,
    Path(kind): Path<String>,
) -> ApiResult<serde_json::Value> {
    let template = match kind.as_str() {
        "block" => serde_json::to_value(state.node.get_block_template()),
        "tx" => serde_json::to_value(state.node.get_transaction_template()),
        "coinbase" => serde_json::to_value(state.node.get_coinbase_template()),
        other => return Err(not_found(format!("No template named {}", other))),
    };
    template
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string()))
}
