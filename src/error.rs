//! Error types for the distributor library

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, DistributorError>;

/// Main error type for the library
#[derive(Debug, Error)]
pub enum DistributorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// CSV reading or writing error
    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid input row or value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Contract call error
    #[error("Contract call error: {0}")]
    ContractCall(String),

    /// A single-entry batch was rejected by gas estimation
    #[error("Entry {index} ({address}) cannot be processed, gas estimation rejected it: {reason}")]
    UnprocessableEntry {
        index: usize,
        address: Address,
        reason: String,
    },

    /// Transport failure that exhausted its retries
    #[error("Transport error: {0}")]
    Transport(String),

    /// Transaction submission error
    #[error("Transaction error at cursor {cursor}: {reason}")]
    Transaction { cursor: usize, reason: String },

    /// Transaction was not included before the confirmation timeout
    #[error("Transaction {tx_hash} not confirmed in time (resume from index {cursor})")]
    ConfirmationTimeout { tx_hash: B256, cursor: usize },

    /// Transaction was mined but reverted
    #[error("Transaction {tx_hash} reverted (resume from index {cursor})")]
    TransactionReverted { tx_hash: B256, cursor: usize },

    /// Block explorer API error
    #[error("Explorer error: {0}")]
    Explorer(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
