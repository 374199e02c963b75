//! Storage engine boundary
//!
//! The index/query engine is an external service. The store only talks to it
//! through [`SearchEngine`]: admin and single-document requests go through
//! `execute`, batched writes through `bulk`, reads through `search`.

mod memory;

pub use memory::MemoryEngine;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::models::{BulkItemResult, BulkOperation, EngineRequest, EngineResponse, SearchRequest, SearchResponse};

/// Black-box index/query engine.
///
/// Implementations must be safe to call concurrently. Errors returned here
/// fail the whole call; per-item failures of a bulk request are reported in
/// the returned list, one entry per operation, in order.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Run one admin or single-document request
    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse>;

    /// Apply a batch of writes as one round trip
    async fn bulk(&self, operations: Vec<BulkOperation>) -> Result<Vec<BulkItemResult>>;

    /// Run one search against an index or alias
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse>;
}

/// Bound an engine call by the transport timeout. Expiry is reported as
/// [`StoreError::Unavailable`] so callers can retry.
pub async fn with_timeout<T, F>(timeout: Duration, operation: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "engine request timed out"
            );
            Err(StoreError::Unavailable(format!(
                "{} timed out after {}ms",
                operation,
                timeout.as_millis()
            )))
        }
    }
}
