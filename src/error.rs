//! Error types for the rebuild batching layer.

use crate::types::NodeId;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Persistence(format!("sled: {}", err))
    }
}

/// A mutation payload that does not match the shape its operation expects.
///
/// This is a caller bug, not an operational condition.
#[derive(Debug, Error)]
#[error("{op} expects {expected}: {reason}")]
pub struct PayloadError {
    pub op: &'static str,
    pub expected: &'static str,
    pub reason: String,
}

/// Query-related errors
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Coordinator-level errors
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Contract violation: {0}")]
    ContractViolation(#[from] PayloadError),

    #[error("Handler {action} received a {event} event")]
    EventMismatch {
        action: &'static str,
        event: &'static str,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Cannot flush while a query pass is running")]
    QueryInFlight,

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for CoordinatorError {
    fn from(err: config::ConfigError) -> Self {
        CoordinatorError::ConfigError(err.to_string())
    }
}

impl CoordinatorError {
    /// True for errors caused by the caller breaking a handler's input contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            CoordinatorError::ContractViolation(_) | CoordinatorError::EventMismatch { .. }
        )
    }
}
