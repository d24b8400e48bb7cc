//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::config::ApiConfig;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/status", get(handlers::get_status))
        // Chain endpoints
        .route("/api/chain", get(handlers::get_chain))
        .route(
            "/api/chain/blocks/{height}",
            get(handlers::get_block_by_height),
        )
        .route("/api/chain/hash/{hash}", get(handlers::get_block_by_hash))
        .route("/api/chain/submit", post(handlers::submit_block))
        // Transactions
        .route("/api/mempool", get(handlers::get_mempool))
        .route("/api/tx/submit", post(handlers::submit_transaction))
        .route("/api/tx/{id}", get(handlers::get_pending_transaction))
        .route("/api/utxo/{pk}", get(handlers::get_utxo))
        // Parameters and templates
        .route("/api/params", get(handlers::get_params))
        .route("/api/template/{kind}", get(handlers::get_template))
        .with_state(state)
        .layer(cors)
}

/// Bind and serve the API until the process stops
pub async fn serve(state: ApiState, config: &ApiConfig) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("REST API listening on http://{}", addr);
    axum::serve(listener, create_router(state)).await
}
