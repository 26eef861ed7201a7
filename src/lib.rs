//! ReportChain - an append-only proof-of-work ledger for notarized reports
//!
//! # Architecture
//!
//! ## Ledger Core
//! - [`blockchain`] - Blocks, the chain, canonical hashing and validation
//! - [`transaction`] - Transaction records
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work predicate and search
//!
//! ## Concurrency & Lifecycle
//! - [`ledger`] - Lock-guarded shared ledger handle
//! - [`node`] - Node lifecycle (config, storage, ledger)
//!
//! ## State Management
//! - [`persistence`] - JSON file, SQLite and in-memory stores
//!
//! ## Integration
//! - [`api`] - HTTP routes (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Ledger Core
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus
// ============================================================================
pub mod miner;

// ============================================================================
// Concurrency & Lifecycle
// ============================================================================
pub mod ledger;
pub mod node;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
