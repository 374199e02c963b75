use thiserror::Error;

use crate::models::CrawlerStatus;

/// Main error type for crawl-index store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed request: unknown field, unknown index, bad sort. Not retried.
    #[error("Query error: {0}")]
    Query(String),

    /// Transport failure or timeout. Retried by the caller with backoff.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Generation or alias name collision during a migration.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid crawler status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: CrawlerStatus, to: CrawlerStatus },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Check if this error indicates a transient failure that could be retried
    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Short machine-readable kind, used in bulk item outcomes and logs
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Query(_) => "query_error",
            StoreError::Unavailable(_) => "store_unavailable",
            StoreError::Conflict(_) => "conflict_error",
            StoreError::InvalidRecord(_) => "invalid_record",
            StoreError::InvalidTransition { .. } => "invalid_transition",
            StoreError::Serialization(_) => "serialization_error",
            StoreError::Internal(_) => "internal_error",
        }
    }
}
