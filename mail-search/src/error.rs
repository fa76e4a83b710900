//! Error types for mail-search

use thiserror::Error;

/// Result type alias for mail-search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Search client error types
///
/// These never reach the controller: the gateway folds every variant into a
/// [`GatewayResult`](crate::gateway::GatewayResult).
#[derive(Error, Debug)]
pub enum SearchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Body could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request aborted through its cancellation token
    #[error("Request cancelled")]
    Cancelled,

    /// Search session task is gone
    #[error("Search session closed")]
    SessionClosed,
}
