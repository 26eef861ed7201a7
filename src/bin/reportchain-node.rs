#![forbid(unsafe_code)]
//! Report ledger node: loads the configured chain and serves the HTTP API.

use std::sync::Arc;
use reportchain::api::run_api_server;
use reportchain::config::load_config;
use reportchain::node::{init_tracing, Node};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");

    let config = load_config()?;
    let node = Node::init(config)?;
    info!(
        blocks = node.ledger.len(),
        "ReportChain node ready"
    );

    run_api_server(Arc::new(node)).await
}
