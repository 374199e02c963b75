//! Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use crawldex::models::{
    BulkItemResult, BulkOperation, EngineRequest, EngineResponse, Filter, ItemError,
    SubSearchResult,
};
use crawldex::{
    DocumentStore, MemoryEngine, PageRecord, Result, SearchEngine, SearchRequest, SearchResponse,
    StoreConfig, StoreError,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const COLLECTION: &str = "pages";
pub const FIRST_GENERATION: &str = "pages-v1";

/// Route store logs to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Store over a fresh in-process engine with one generation bound
pub async fn memory_store() -> (Arc<MemoryEngine>, DocumentStore) {
    init_tracing();
    let engine = Arc::new(MemoryEngine::new());
    let store = DocumentStore::new(engine.clone(), StoreConfig::new(COLLECTION));
    store.migrate(FIRST_GENERATION).await.unwrap();
    (engine, store)
}

pub fn page(url: &str) -> PageRecord {
    PageRecord::new(url)
}

/// Failure injected by [`FailingEngine`]
#[derive(Clone, Debug)]
pub enum Fault {
    None,
    /// Every call fails as if the connection dropped
    Down,
    /// Every call stalls this long before reaching the engine
    Slow(Duration),
    /// Alias lookups fail, everything else works
    AliasLookupFails,
    /// The multi-search sub-query for this URL fails
    FailLookupOf(String),
}

/// Engine wrapper that injects transport faults in front of a
/// [`MemoryEngine`]
pub struct FailingEngine {
    pub inner: MemoryEngine,
    fault: Mutex<Fault>,
}

impl FailingEngine {
    pub fn new() -> Self {
        Self {
            inner: MemoryEngine::new(),
            fault: Mutex::new(Fault::None),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    async fn before_call(&self) -> Result<()> {
        let fault = self.fault.lock().clone();
        match fault {
            Fault::Down => Err(StoreError::Unavailable("connection refused".to_string())),
            Fault::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SearchEngine for FailingEngine {
    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse> {
        self.before_call().await?;
        let fault = self.fault.lock().clone();
        match (fault, request) {
            (Fault::AliasLookupFails, EngineRequest::GetAlias { .. }) => {
                Err(StoreError::Unavailable("alias endpoint down".to_string()))
            }
            (Fault::FailLookupOf(url), EngineRequest::MultiSearch(requests)) => {
                let broken = Filter::url(url);
                let mut results = Vec::with_capacity(requests.len());
                for request in requests {
                    if request.query == broken {
                        results.push(SubSearchResult::Err(ItemError::new(
                            "store_unavailable",
                            "shard failure",
                        )));
                        continue;
                    }
                    match self.inner.search(request).await {
                        Ok(response) => results.push(SubSearchResult::Ok(response)),
                        Err(e) => results.push(SubSearchResult::Err(ItemError::from(e))),
                    }
                }
                Ok(EngineResponse::MultiSearch(results))
            }
            (_, request) => self.inner.execute(request).await,
        }
    }

    async fn bulk(&self, operations: Vec<BulkOperation>) -> Result<Vec<BulkItemResult>> {
        self.before_call().await?;
        self.inner.bulk(operations).await
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        self.before_call().await?;
        self.inner.search(request).await
    }
}

/// Store over a [`FailingEngine`] with one generation bound
pub async fn failing_store(timeout: Duration) -> (Arc<FailingEngine>, DocumentStore) {
    init_tracing();
    let engine = Arc::new(FailingEngine::new());
    let config = StoreConfig::new(COLLECTION).with_request_timeout(timeout);
    let store = DocumentStore::new(engine.clone(), config);
    store.migrate(FIRST_GENERATION).await.unwrap();
    (engine, store)
}
