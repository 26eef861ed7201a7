//! REST API server for ReportChain
//!
//! Thin JSON routes over [`Node`]. Input validation lives here; the ledger
//! itself accepts whatever it is given.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::Node;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e @ ChainError::ChainIntegrityViolation { .. }) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            ApiError::BlockchainError(
                e @ (ChainError::ProofSearchExhausted { .. } | ChainError::ProofSearchCancelled),
            ) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::BlockchainError(ChainError::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BlockchainError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct ChainResponse {
    chain: Vec<Block>,
    length: usize,
}

#[derive(Serialize)]
struct SenderHistoryResponse {
    sender: String,
    transaction_ids: Vec<String>,
}

#[derive(Serialize)]
struct ReportResponse {
    #[serde(rename = "transactionID")]
    transaction_id: String,
    report: String,
    block_index: u64,
}

#[derive(Deserialize)]
pub struct PushReportRequest {
    pub sender: String,
    pub report: String,
}

#[derive(Serialize)]
struct PushReportResponse {
    #[serde(rename = "transactionID")]
    transaction_id: String,
    block: Block,
}

const REQUIRED_TRANSACTION_FIELDS: [&str; 3] = ["sender", "report", "transactionID"];

/// Pull the three transaction fields out of an arbitrary JSON body. Any
/// missing or non-string field is reported as `Missing fields`.
fn transaction_fields(body: &Value) -> Result<[String; 3], ApiError> {
    let mut fields: [String; 3] = Default::default();
    for (slot, name) in fields.iter_mut().zip(REQUIRED_TRANSACTION_FIELDS) {
        *slot = body
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::InvalidInput("Missing fields".to_string()))?
            .to_string();
    }
    Ok(fields)
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration for every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/sender/:sender", get(transactions_by_sender))
        .route("/chain", get(full_chain))
        .route("/chain/validate", get(validate_chain))
        .route("/reports", post(push_report))
        .route("/reports/:transaction_id", get(get_report))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

pub async fn run_api_server(node: Arc<Node>) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", node.config.api.host, node.config.api.port).parse()?;
    let app = build_api_router(node.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(node))
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C and stops any proof search still running on a
/// blocking worker.
async fn shutdown_signal(node: Arc<Node>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
    node.shutdown();
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Proof search is CPU-bound, so it runs off the async executor.
async fn blocking<T, F>(node: Arc<Node>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Node) -> Result<T, ChainError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(node.as_ref()))
        .await
        .map_err(|e| ApiError::InternalError(format!("worker task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<Block>, ApiError> {
    let block = blocking(node, |node| node.mine()).await?;
    Ok(Json(block))
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let [sender, report, transaction_id] = transaction_fields(&body)?;
    let index = node.submit_transaction(sender, report, transaction_id)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Transaction will be added to Block {}", index),
        }),
    ))
}

async fn full_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let chain = node.ledger.blocks();
    let length = chain.len();
    Json(ChainResponse { chain, length })
}

async fn validate_chain(State(node): State<Arc<Node>>) -> Result<Json<Value>, ApiError> {
    node.ledger.validate()?;
    Ok(Json(serde_json::json!({
        "valid": true,
        "length": node.ledger.len(),
    })))
}

async fn transactions_by_sender(
    State(node): State<Arc<Node>>,
    Path(sender): Path<String>,
) -> impl IntoResponse {
    let transaction_ids = node.ledger.transactions_by_sender(&sender);
    Json(SenderHistoryResponse {
        sender,
        transaction_ids,
    })
}

async fn get_report(
    State(node): State<Arc<Node>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let (block_index, tx) = node
        .ledger
        .find_transaction(&transaction_id)
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    Ok(Json(ReportResponse {
        transaction_id: tx.transaction_id,
        report: tx.report,
        block_index,
    }))
}

async fn push_report(
    State(node): State<Arc<Node>>,
    Json(req): Json<PushReportRequest>,
) -> Result<(StatusCode, Json<PushReportResponse>), ApiError> {
    let (transaction_id, block) =
        blocking(node, move |node| node.push_report(req.sender, req.report)).await?;

    Ok((
        StatusCode::CREATED,
        Json(PushReportResponse {
            transaction_id,
            block,
        }),
    ))
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "length": node.ledger.len(),
        "pending": node.ledger.pending_transactions().len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
