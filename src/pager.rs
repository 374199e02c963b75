//! Cursor pagination over the collection
//!
//! Pages are keyed on `address.url` ascending. The cursor is the URL of the
//! last record returned; the next page starts strictly after it. Nothing is
//! held server-side, so a cursor never expires. Records inserted behind the
//! cursor are not revisited; records inserted ahead of it show up in later
//! pages.

use futures::stream::{self, Stream};
use serde_json::{json, Value};

use crate::error::{Result, StoreError};
use crate::models::{Filter, SearchRequest, StoredPage};
use crate::query::types::SortField;
use crate::schema::page::fields;
use crate::store::DocumentStore;

/// One page of a scan
#[derive(Clone, Debug, PartialEq)]
pub struct ScanPage {
    pub records: Vec<StoredPage>,
    /// Key to pass as `after` for the next page; `None` once the scan
    /// reached the end of the collection
    pub next_after: Option<String>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.next_after.is_none()
    }
}

pub struct CursorPager<'a> {
    store: &'a DocumentStore,
}

impl<'a> CursorPager<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Fetch up to `page_size` records whose URL sorts strictly after
    /// `after` (from the start when `None`).
    pub async fn scan(&self, after: Option<&str>, page_size: usize) -> Result<ScanPage> {
        if page_size == 0 {
            return Err(StoreError::Query("page size must be at least 1".to_string()));
        }

        let mut request = SearchRequest::new(self.store.collection())
            .with_query(Filter::exists(fields::URL))
            .with_sort(SortField::asc(fields::URL))
            .with_size(page_size);
        if let Some(after) = after {
            request = request.with_search_after(vec![json!(after)]);
        }

        let response = self.store.search(request).await?;
        let last_key = response.hits.last().map(|hit| {
            hit.sort
                .first()
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let records = response.into_pages()?;

        let next_after = if records.len() < page_size {
            None
        } else {
            match last_key {
                Some(Some(key)) => Some(key),
                _ => records.last().map(|r| r.page.url().to_string()),
            }
        };

        Ok(ScanPage {
            records,
            next_after,
        })
    }

    /// Scan with the configured default page size
    pub async fn scan_default(&self, after: Option<&str>) -> Result<ScanPage> {
        self.scan(after, self.store.config().default_page_size).await
    }

    /// Walk the whole collection, one page of records per item. Ends after
    /// the last page or the first error.
    pub fn stream(&self, page_size: usize) -> impl Stream<Item = Result<Vec<StoredPage>>> + 'a {
        let store = self.store;
        stream::try_unfold(Some(None::<String>), move |cursor| async move {
            let Some(after) = cursor else {
                return Ok(None);
            };
            let page = CursorPager::new(store).scan(after.as_deref(), page_size).await?;
            if page.records.is_empty() {
                return Ok(None);
            }
            let next = page.next_after.map(Some);
            Ok(Some((page.records, next)))
        })
    }
}
