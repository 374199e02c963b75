//! Backlink accumulation
//!
//! Merging a backlink is read-modify-write over the whole record: look the
//! target up, fold the link in, write the record back under the id it was
//! read with. Nothing locks the record in between. Two merges racing on the
//! same target can both create it, or one can overwrite the other's list.
//! That loss is accepted: the crawler re-reports links, so the set
//! converges.

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::url::{domain_of, normalize_url};
use crate::models::{BackLink, DocumentId, PageRecord, StoredPage};
use crate::store::{page_id, DocumentStore};

pub struct BacklinkMerger<'a> {
    store: &'a DocumentStore,
}

impl<'a> BacklinkMerger<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Fold `link` into the backlinks of the page at `target_url`, creating a
    /// bare `NotCrawled` record when the page is unknown. A link from a
    /// source already listed replaces the old entry. Returns the id written.
    pub async fn merge_backlink(&self, target_url: &str, link: BackLink) -> Result<DocumentId> {
        let target = normalize_url(target_url);
        let matches = self.store.find_by_url(&target).await?;

        let (id, record) = if matches.is_empty() {
            debug!(url = %target, "backlink target unknown, creating it");
            (page_id(&target), PageRecord::new(&target))
        } else {
            let write_index = self.store.write_index().await;
            fold_copies(&target, &write_index, matches)
        };

        let source = link.source.clone();
        let record = record
            .with_backlink(link)
            .with_domain_name(domain_of(&target));
        let backlinks = record.inferred_data.back_links.len();

        let id = self.store.upsert(record, Some(id)).await?;
        debug!(url = %target, source = %source, backlinks, "merged backlink");
        Ok(id)
    }
}

/// Pick the copy to merge into when a URL is stored more than once: the one
/// in the generation writes go to, else the first. Backlinks held only by
/// the other copies are carried over.
fn fold_copies(target: &str, write_index: &str, mut matches: Vec<StoredPage>) -> (DocumentId, PageRecord) {
    let chosen = matches
        .iter()
        .position(|m| m.index == write_index)
        .unwrap_or(0);
    let base = matches.swap_remove(chosen);
    if !matches.is_empty() {
        warn!(
            url = %target,
            copies = matches.len() + 1,
            index = %base.index,
            "several records for backlink target, merging into one"
        );
    }

    let mut record = base.page;
    for other in matches {
        for link in other.page.inferred_data.back_links {
            let known = record
                .inferred_data
                .back_links
                .iter()
                .any(|l| l.source == link.source);
            if !known {
                record.inferred_data.back_links.push(link);
            }
        }
    }
    (base.id, record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::engine::MemoryEngine;
    use crate::models::{CrawlerStatus, Ranks};
    use std::sync::Arc;

    async fn store() -> DocumentStore {
        let store = DocumentStore::new(Arc::new(MemoryEngine::new()), StoreConfig::new("pages"));
        store.migrate("pages-v1").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_merge_creates_missing_target() {
        let store = store().await;
        let id = store
            .backlinks()
            .merge_backlink("https://www.target.org/page/", BackLink::new("see", "https://src.org"))
            .await
            .unwrap();
        assert_eq!(id, page_id("https://target.org/page"));

        let stored = store.get(&id).await.unwrap().unwrap().page;
        assert_eq!(stored.url(), "https://target.org/page");
        assert_eq!(stored.crawler_status, CrawlerStatus::NotCrawled);
        assert_eq!(stored.inferred_data.domain_name, "target.org");
        assert_eq!(stored.inferred_data.back_links, vec![BackLink::new("see", "https://src.org")]);
    }

    #[tokio::test]
    async fn test_merge_dedups_by_source() {
        let store = store().await;
        let merger = store.backlinks();
        let target = "https://target.org";
        merger.merge_backlink(target, BackLink::new("first", "https://s1.org")).await.unwrap();
        merger.merge_backlink(target, BackLink::new("second", "https://s1.org")).await.unwrap();
        let id = merger.merge_backlink(target, BackLink::new("other", "https://s2.org")).await.unwrap();

        let links = store.get(&id).await.unwrap().unwrap().page.inferred_data.back_links;
        assert_eq!(
            links,
            vec![
                BackLink::new("second", "https://s1.org"),
                BackLink::new("other", "https://s2.org"),
            ]
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_other_fields_and_id() {
        let store = store().await;
        let record = PageRecord::new("https://target.org")
            .with_status(CrawlerStatus::Crawled)
            .and_then(|r| r.with_ranks(Ranks { pagerank: 0.7, smart_rank: 0.4 }))
            .unwrap();
        let id = store.upsert(record, None).await.unwrap();

        let merged_id = store
            .backlinks()
            .merge_backlink("https://target.org", BackLink::new("x", "https://s.org"))
            .await
            .unwrap();
        assert_eq!(merged_id, id);

        let page = store.get(&id).await.unwrap().unwrap().page;
        assert_eq!(page.crawler_status, CrawlerStatus::Crawled);
        assert_eq!(page.inferred_data.ranks.pagerank, 0.7);
        assert_eq!(page.inferred_data.back_links.len(), 1);
        assert_eq!(store.count_pages().await.unwrap(), 1);
    }
}
