//! Document store over a logical page collection
//!
//! Writes go to the newest generation bound to the collection alias; reads
//! cover every bound generation, so duplicates left behind by a migration
//! stay visible instead of being hidden.

use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::alias::AliasManager;
use crate::backlink::BacklinkMerger;
use crate::config::StoreConfig;
use crate::engine::{with_timeout, SearchEngine};
use crate::error::{Result, StoreError};
use crate::models::url::normalize_url;
use crate::models::{
    current_timestamp_millis, BulkItemOutcome, BulkOperation, BulkReport, CrawlerStatus,
    DocumentId, EngineRequest, EngineResponse, Filter, ItemError, PageRecord, SearchRequest,
    SearchResponse, StoredPage, SubSearchResult, UrlLookup,
};
use crate::pager::{CursorPager, ScanPage};
use crate::query::types::SortField;
use crate::schema::page::{fields, URL_IGNORE_ABOVE};
use crate::schema::create_generation_request;

/// Deterministic storage id for a URL: the same normalized URL always maps
/// to the same id, so resubmitting a page replaces it.
pub fn page_id(url: &str) -> DocumentId {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, normalize_url(url).as_bytes()).to_string()
}

fn unexpected(operation: &str, response: EngineResponse) -> StoreError {
    StoreError::Internal(format!(
        "unexpected response to {}: {:?}",
        operation, response
    ))
}

/// Page store bound to one logical collection
pub struct DocumentStore {
    engine: Arc<dyn SearchEngine>,
    aliases: AliasManager,
    config: StoreConfig,
}

impl DocumentStore {
    pub fn new(engine: Arc<dyn SearchEngine>, config: StoreConfig) -> Self {
        let aliases = AliasManager::new(engine.clone(), config.request_timeout());
        Self {
            engine,
            aliases,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Logical collection name
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    pub fn aliases(&self) -> &AliasManager {
        &self.aliases
    }

    pub fn pager(&self) -> CursorPager<'_> {
        CursorPager::new(self)
    }

    pub fn backlinks(&self) -> BacklinkMerger<'_> {
        BacklinkMerger::new(self)
    }

    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse> {
        let name = request.name();
        trace!(request = name, write = request.is_write(), collection = %self.collection(), "engine request");
        with_timeout(
            self.config.request_timeout(),
            name,
            self.engine.execute(request),
        )
        .await
    }

    /// Index name reads are sent to: every generation the collection
    /// resolves to
    async fn read_index(&self) -> String {
        self.aliases.resolve(self.collection()).await.join(",")
    }

    /// Generation writes land in: the most recently bound one
    pub(crate) async fn write_index(&self) -> String {
        self.aliases
            .resolve(self.collection())
            .await
            .pop()
            .unwrap_or_else(|| self.collection().to_string())
    }

    // Generations

    /// Create a physical generation with the page mapping and the configured
    /// shard and replica counts. Fails with `Conflict` if it already exists.
    pub async fn create_generation(&self, physical: &str) -> Result<()> {
        let request = create_generation_request(physical, self.config.index_settings.clone());
        self.execute(request).await?;
        info!(index = physical, collection = self.collection(), "created generation");
        Ok(())
    }

    /// Delete a whole physical generation together with its alias bindings
    pub async fn delete_generation(&self, physical: &str) -> Result<()> {
        self.execute(EngineRequest::DeleteIndex {
            index: physical.to_string(),
        })
        .await?;
        info!(index = physical, "deleted generation");
        Ok(())
    }

    /// Create `physical` and move the collection alias onto it. Returns the
    /// generations that were unbound; they are left in place for the caller
    /// to delete once nothing reads them.
    pub async fn migrate(&self, physical: &str) -> Result<Vec<String>> {
        self.create_generation(physical).await?;
        self.aliases.cutover(self.collection(), physical).await
    }

    // Writes

    /// Write a record under `id`, replacing any document stored under it.
    /// Without an id the engine assigns one. Stamps `crawlerTimestamp`.
    pub async fn upsert(&self, record: PageRecord, id: Option<DocumentId>) -> Result<DocumentId> {
        let record = record.normalized().stamped(current_timestamp_millis());
        record.validate()?;
        let document = serde_json::to_value(&record)?;
        let index = self.write_index().await;

        match self
            .execute(EngineRequest::Index {
                index,
                id,
                document,
            })
            .await?
        {
            EngineResponse::Indexed(ack) => {
                debug!(index = %ack.index, id = %ack.id, url = record.url(), version = ack.version, "upserted page");
                Ok(ack.id)
            }
            other => Err(unexpected("Index", other)),
        }
    }

    /// Write a batch in one round trip. Every record gets its own outcome,
    /// in input order; a bad record never fails the others.
    pub async fn bulk_upsert(&self, items: Vec<(PageRecord, Option<DocumentId>)>) -> Result<BulkReport> {
        if items.is_empty() {
            return Ok(BulkReport::default());
        }

        let index = self.write_index().await;
        let now = current_timestamp_millis();
        let total = items.len();
        let mut outcomes: Vec<Option<BulkItemOutcome>> = (0..total).map(|_| None).collect();
        let mut positions = Vec::with_capacity(total);
        let mut operations = Vec::with_capacity(total);

        for (position, (record, id)) in items.into_iter().enumerate() {
            let record = record.normalized().stamped(now);
            let document = record
                .validate()
                .and_then(|_| serde_json::to_value(&record).map_err(StoreError::from));
            match document {
                Ok(document) => {
                    positions.push(position);
                    operations.push(BulkOperation::Index {
                        index: index.clone(),
                        id,
                        document,
                    });
                }
                Err(e) => {
                    outcomes[position] = Some(BulkItemOutcome::Failed {
                        position,
                        error: ItemError::from(&e),
                    });
                }
            }
        }

        if !operations.is_empty() {
            let results = with_timeout(
                self.config.request_timeout(),
                "Bulk",
                self.engine.bulk(operations),
            )
            .await?;
            if results.len() != positions.len() {
                return Err(StoreError::Internal(format!(
                    "bulk returned {} results for {} operations",
                    results.len(),
                    positions.len()
                )));
            }
            for (position, result) in positions.into_iter().zip(results) {
                outcomes[position] = Some(match result {
                    Ok(ack) => BulkItemOutcome::Stored {
                        position,
                        id: ack.id,
                    },
                    Err(error) => BulkItemOutcome::Failed { position, error },
                });
            }
        }

        let report = BulkReport {
            outcomes: outcomes.into_iter().flatten().collect(),
        };
        if report.has_failures() {
            warn!(index = %index, items = total, failed = report.failed(), "bulk upsert finished with failures");
        } else {
            info!(index = %index, items = total, "bulk upsert finished");
        }
        Ok(report)
    }

    // Reads

    /// Point lookup by storage id across the collection's generations
    pub async fn get(&self, id: &str) -> Result<Option<StoredPage>> {
        let index = self.read_index().await;
        match self
            .execute(EngineRequest::Get {
                index,
                id: id.to_string(),
            })
            .await?
        {
            EngineResponse::Document(hit) => hit.map(|h| h.into_page()).transpose(),
            other => Err(unexpected("Get", other)),
        }
    }

    /// Run an ad-hoc search over the collection. The request's `index` is
    /// replaced with the collection's generations.
    pub async fn search(&self, mut request: SearchRequest) -> Result<SearchResponse> {
        request.index = self.read_index().await;
        self.engine_search(request).await
    }

    async fn engine_search(&self, request: SearchRequest) -> Result<SearchResponse> {
        with_timeout(
            self.config.request_timeout(),
            "Search",
            self.engine.search(request),
        )
        .await
    }

    fn url_request(&self, index: &str, url: &str, size: usize) -> SearchRequest {
        SearchRequest::new(index)
            .with_query(Filter::url(normalize_url(url)))
            .with_size(size)
    }

    /// Turn the first response of a URL lookup into every match. A response
    /// capped at `lookup_batch_size` is re-run for its full hit count. URLs
    /// longer than the keyword limit never match the term query, so those
    /// are fetched by their page id instead.
    async fn complete_lookup(&self, index: &str, url: &str, first: SearchResponse) -> Result<Vec<StoredPage>> {
        let response = if first.total_hits > first.hits.len() as u64 {
            debug!(url, returned = first.hits.len(), total = first.total_hits, "url lookup truncated, fetching the rest");
            let size = usize::try_from(first.total_hits).unwrap_or(usize::MAX);
            self.engine_search(self.url_request(index, url, size)).await?
        } else {
            first
        };
        let mut pages = response.into_pages()?;

        let normalized = normalize_url(url);
        if pages.is_empty() && normalized.len() > URL_IGNORE_ABOVE {
            if let Some(stored) = self.get(&page_id(&normalized)).await? {
                if stored.page.url() == normalized {
                    debug!(length = normalized.len(), "found over-long url by page id");
                    pages.push(stored);
                }
            }
        }

        if pages.len() > 1 {
            warn!(url, matches = pages.len(), "duplicate records for url");
        }
        Ok(pages)
    }

    /// Every record stored under the normalized form of `url`. More than one
    /// match means the collection holds duplicates.
    pub async fn find_by_url(&self, url: &str) -> Result<Vec<StoredPage>> {
        let index = self.read_index().await;
        let first = self
            .engine_search(self.url_request(&index, url, self.config.lookup_batch_size))
            .await?;
        self.complete_lookup(&index, url, first).await
    }

    /// Look up many URLs in one multi-search. Each URL gets its own result;
    /// a failed sub-query only fails its own entry.
    pub async fn find_by_urls_bulk<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<UrlLookup>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.read_index().await;
        let requests = urls
            .iter()
            .map(|url| self.url_request(&index, url.as_ref(), self.config.lookup_batch_size))
            .collect();

        let results = match self.execute(EngineRequest::MultiSearch(requests)).await? {
            EngineResponse::MultiSearch(results) => results,
            other => return Err(unexpected("MultiSearch", other)),
        };
        if results.len() != urls.len() {
            return Err(StoreError::Internal(format!(
                "multi-search returned {} results for {} queries",
                results.len(),
                urls.len()
            )));
        }

        let mut lookups = Vec::with_capacity(urls.len());
        for (url, result) in urls.iter().zip(results) {
            let url = url.as_ref();
            let result = match result {
                SubSearchResult::Ok(response) => self
                    .complete_lookup(&index, url, response)
                    .await
                    .map_err(ItemError::from),
                SubSearchResult::Err(error) => Err(error),
            };
            lookups.push(UrlLookup {
                url: url.to_string(),
                result,
            });
        }
        Ok(lookups)
    }

    /// Number of records matching `filter`
    pub async fn count(&self, filter: Filter) -> Result<u64> {
        let index = self.read_index().await;
        match self.execute(EngineRequest::Count { index, query: filter }).await? {
            EngineResponse::Count(n) => Ok(n),
            other => Err(unexpected("Count", other)),
        }
    }

    /// Up to `limit` records with crawler status `status`, highest `field`
    /// first
    pub async fn top_by_field(&self, field: &str, limit: usize, status: CrawlerStatus) -> Result<Vec<StoredPage>> {
        let request = SearchRequest::new("")
            .with_query(Filter::status(status))
            .with_sort(SortField::desc(field))
            .with_size(limit);
        self.search(request).await?.into_pages()
    }

    /// Sum of `field` over every record not matching `exclude`. 0.0 when no
    /// record qualifies.
    pub async fn aggregate_sum(&self, field: &str, exclude: Filter) -> Result<f64> {
        let index = self.read_index().await;
        match self
            .execute(EngineRequest::Sum {
                index,
                field: field.to_string(),
                query: Filter::not(exclude),
            })
            .await?
        {
            EngineResponse::Sum(total) => Ok(total),
            other => Err(unexpected("Sum", other)),
        }
    }

    // Producer facade

    /// Store a crawled page under the id derived from its URL
    pub async fn submit_page(&self, record: PageRecord) -> Result<DocumentId> {
        let id = page_id(record.url());
        self.upsert(record, Some(id)).await
    }

    /// Store a batch of crawled pages under ids derived from their URLs
    pub async fn submit_batch(&self, records: Vec<PageRecord>) -> Result<BulkReport> {
        let items = records
            .into_iter()
            .map(|record| {
                let id = page_id(record.url());
                (record, Some(id))
            })
            .collect();
        self.bulk_upsert(items).await
    }

    // Rank consumer facade

    /// One page of the whole collection in URL order
    pub async fn scan_all(&self, after: Option<&str>, page_size: usize) -> Result<ScanPage> {
        self.pager().scan(after, page_size).await
    }

    /// Next pages waiting for rank computation, highest smart rank first
    pub async fn top_needing_rank(&self, limit: usize) -> Result<Vec<StoredPage>> {
        self.top_by_field(fields::SMART_RANK, limit, CrawlerStatus::AwaitingPagerank)
            .await
    }

    /// Pagerank held by sink pages, the ones without outbound links
    pub async fn global_sink_rank_mass(&self) -> Result<f64> {
        self.aggregate_sum(fields::PAGERANK, Filter::has_outbound_links())
            .await
    }

    /// Number of records with a non-empty URL
    pub async fn count_pages(&self) -> Result<u64> {
        self.count(Filter::has_url()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::models::{BackLink, Ranks};

    async fn store() -> (Arc<MemoryEngine>, DocumentStore) {
        let engine = Arc::new(MemoryEngine::new());
        let store = DocumentStore::new(engine.clone(), StoreConfig::new("pages"));
        store.migrate("pages-v1").await.unwrap();
        (engine, store)
    }

    #[test]
    fn test_page_id_is_deterministic() {
        assert_eq!(page_id("https://www.a.org/x/"), page_id("https://a.org/x"));
        assert_ne!(page_id("https://a.org/x"), page_id("https://a.org/y"));
    }

    #[tokio::test]
    async fn test_upsert_writes_to_current_generation() {
        let (engine, store) = store().await;
        let id = store.upsert(PageRecord::new("https://a.org"), None).await.unwrap();
        assert_eq!(engine.document_count("pages-v1"), Some(1));

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.index, "pages-v1");
        assert_eq!(stored.page.url(), "https://a.org");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_url() {
        let (_, store) = store().await;
        let err = store.upsert(PageRecord::default(), None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn test_upsert_stamps_timestamp_forward() {
        let (_, store) = store().await;
        let mut record = PageRecord::new("https://a.org");
        record.crawler_timestamp = 0;
        let id = store.upsert(record, None).await.unwrap();
        let stored = store.get(&id).await.unwrap().unwrap();
        assert!(stored.page.crawler_timestamp > 0);
    }

    #[tokio::test]
    async fn test_find_by_url_normalizes_input() {
        let (_, store) = store().await;
        store.submit_page(PageRecord::new("https://a.org/docs")).await.unwrap();

        let found = store.find_by_url("https://www.a.org/docs/?ref=1#top").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, page_id("https://a.org/docs"));
        assert!(store.find_by_url("https://b.org").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_url_surfaces_duplicates() {
        let (_, store) = store().await;
        store.upsert(PageRecord::new("https://a.org"), None).await.unwrap();
        store.upsert(PageRecord::new("https://a.org"), None).await.unwrap();
        assert_eq!(store.find_by_url("https://a.org").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_top_by_field_orders_descending() {
        let (_, store) = store().await;
        for (url, smart_rank) in [("https://a.org", 0.2), ("https://b.org", 0.9), ("https://c.org", 0.5)] {
            let record = PageRecord::new(url)
                .with_status(CrawlerStatus::Crawled)
                .and_then(|r| r.with_status(CrawlerStatus::AwaitingPagerank))
                .and_then(|r| r.with_ranks(Ranks { pagerank: 0.0, smart_rank }))
                .unwrap();
            store.submit_page(record).await.unwrap();
        }
        store.submit_page(PageRecord::new("https://d.org")).await.unwrap();

        let top = store.top_needing_rank(2).await.unwrap();
        let urls: Vec<_> = top.iter().map(|p| p.page.url().to_string()).collect();
        assert_eq!(urls, vec!["https://b.org", "https://c.org"]);
    }

    #[tokio::test]
    async fn test_count_pages() {
        let (_, store) = store().await;
        assert_eq!(store.count_pages().await.unwrap(), 0);
        store
            .submit_batch(vec![PageRecord::new("https://a.org"), PageRecord::new("https://b.org")])
            .await
            .unwrap();
        assert_eq!(store.count_pages().await.unwrap(), 2);
        assert_eq!(store.count(Filter::has_backlinks()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_with_unknown_field_is_query_error() {
        let (_, store) = store().await;
        let err = store.count(Filter::exists("address.uri")).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_search_with_source_filter() {
        let (_, store) = store().await;
        store
            .submit_page(PageRecord::new("https://a.org").with_backlink(BackLink::new("x", "https://b.org")))
            .await
            .unwrap();

        let response = store
            .search(SearchRequest::new("").with_source_includes(vec![fields::URL.to_string()]))
            .await
            .unwrap();
        assert_eq!(response.hits.len(), 1);
        assert!(response.hits[0].source.get("inferredData").is_none());
        let page = response.into_pages().unwrap().remove(0).page;
        assert_eq!(page.url(), "https://a.org");
        assert!(page.inferred_data.back_links.is_empty());
    }

    #[tokio::test]
    async fn test_migrate_moves_writes_and_keeps_old_data() {
        let (engine, store) = store().await;
        store.submit_page(PageRecord::new("https://a.org")).await.unwrap();

        let stale = store.migrate("pages-v2").await.unwrap();
        assert_eq!(stale, vec!["pages-v1"]);
        store.submit_page(PageRecord::new("https://b.org")).await.unwrap();

        assert_eq!(engine.document_count("pages-v1"), Some(1));
        assert_eq!(engine.document_count("pages-v2"), Some(1));
        assert_eq!(store.count_pages().await.unwrap(), 1);

        store.delete_generation("pages-v1").await.unwrap();
        assert_eq!(engine.index_names(), vec!["pages-v2"]);
    }

    #[tokio::test]
    async fn test_create_generation_uses_configured_settings() {
        let engine = Arc::new(MemoryEngine::new());
        let config = StoreConfig::new("pages").with_index_settings(crate::config::IndexSettings {
            number_of_shards: 3,
            number_of_replicas: 1,
        });
        let store = DocumentStore::new(engine.clone(), config);
        store.create_generation("pages-v1").await.unwrap();
        assert_eq!(engine.index_settings("pages-v1").unwrap().number_of_shards, 3);

        let err = store.create_generation("pages-v1").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
