use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::filter::Filter;
use super::page::{DocumentId, PageRecord};
use crate::error::Result;
use crate::query::types::SortField;

/// Search request against an index or alias
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    #[serde(default)]
    pub query: Filter,
    #[serde(default)]
    pub sort: Vec<SortField>,
    /// Sort values of the last hit of the previous page; hits must sort
    /// strictly after them
    #[serde(default)]
    pub search_after: Option<Vec<Value>>,
    pub size: usize,
    /// Dotted paths of `_source` to return; `None` returns everything
    #[serde(default)]
    pub source_includes: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            query: Filter::MatchAll,
            sort: Vec::new(),
            search_after: None,
            size: 10,
            source_includes: None,
        }
    }

    pub fn with_query(mut self, query: Filter) -> Self {
        self.query = query;
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_search_after(mut self, after: Vec<Value>) -> Self {
        self.search_after = Some(after);
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_source_includes(mut self, includes: Vec<String>) -> Self {
        self.source_includes = Some(includes);
        self
    }
}

/// One matching document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Physical generation the document lives in
    pub index: String,
    pub id: DocumentId,
    pub source: Value,
    /// Sort values of this hit, usable as the next `search_after`
    #[serde(default)]
    pub sort: Vec<Value>,
}

impl SearchHit {
    /// Decode the source into a page record
    pub fn into_page(self) -> Result<StoredPage> {
        let page: PageRecord = serde_json::from_value(self.source)?;
        Ok(StoredPage {
            index: self.index,
            id: self.id,
            page,
        })
    }
}

/// Search response with timing information
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    /// Documents matching the query, ignoring `size` and `search_after`
    pub total_hits: u64,
    pub took_ms: u64,
}

impl SearchResponse {
    pub fn into_pages(self) -> Result<Vec<StoredPage>> {
        self.hits.into_iter().map(SearchHit::into_page).collect()
    }
}

/// A page record together with where it is stored
#[derive(Clone, Debug, PartialEq)]
pub struct StoredPage {
    pub index: String,
    pub id: DocumentId,
    pub page: PageRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlerStatus;
    use serde_json::json;

    #[test]
    fn test_search_request_builder() {
        let req = SearchRequest::new("pages")
            .with_query(Filter::exists("address.url"))
            .with_sort(SortField::asc("address.url"))
            .with_search_after(vec![json!("https://a.org")])
            .with_size(200);

        assert_eq!(req.index, "pages");
        assert_eq!(req.size, 200);
        assert_eq!(req.sort.len(), 1);
        assert!(req.search_after.is_some());
        assert!(req.source_includes.is_none());
    }

    #[test]
    fn test_search_request_default_size() {
        assert_eq!(SearchRequest::new("pages").size, 10);
    }

    #[test]
    fn test_hit_into_page() {
        let hit = SearchHit {
            index: "pages-v1".to_string(),
            id: "abc".to_string(),
            source: json!({
                "address": {"url": "https://a.org"},
                "crawlerStatus": "Crawled"
            }),
            sort: vec![],
        };
        let stored = hit.into_page().unwrap();
        assert_eq!(stored.id, "abc");
        assert_eq!(stored.page.url(), "https://a.org");
        assert_eq!(stored.page.crawler_status, CrawlerStatus::Crawled);
    }

    #[test]
    fn test_hit_with_bad_source_fails() {
        let hit = SearchHit {
            index: "pages-v1".to_string(),
            id: "abc".to_string(),
            source: json!({"crawlerStatus": "Sleeping"}),
            sort: vec![],
        };
        assert!(hit.into_page().is_err());
    }
}
