//! Property tests for cursor scans and backlink merging

mod common;

use common::memory_store;
use crawldex::{BackLink, PageRecord};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn arb_urls() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("https://[a-z]{1,6}\\.org/[a-zA-Z0-9]{0,5}", 0..40)
        .prop_map(|urls| {
            urls.into_iter()
                .map(|u| PageRecord::new(&u).url().to_string())
                .collect()
        })
}

fn arb_sources() -> impl Strategy<Value = Vec<(usize, String)>> {
    prop::collection::vec((0usize..4, "[a-z]{1,8}"), 1..20)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_scan_visits_every_record_once_in_order(urls in arb_urls(), page_size in 1usize..8) {
        let visited = runtime().block_on(async {
            let (_, store) = memory_store().await;
            store
                .submit_batch(urls.iter().map(|u| PageRecord::new(u)).collect())
                .await
                .unwrap();

            let mut visited = Vec::new();
            let mut after: Option<String> = None;
            let mut calls = 0;
            loop {
                calls += 1;
                let page = store.scan_all(after.as_deref(), page_size).await.unwrap();
                visited.extend(page.records.iter().map(|r| r.page.url().to_string()));
                match page.next_after {
                    Some(next) => after = Some(next),
                    None => break,
                }
            }
            assert!(calls <= urls.len() / page_size + 1 + usize::from(urls.len() % page_size != 0));
            visited
        });

        let expected: Vec<String> = urls.into_iter().collect();
        prop_assert_eq!(visited, expected);
    }

    #[test]
    fn prop_backlinks_stay_unique_by_source(merges in arb_sources()) {
        let links = runtime().block_on(async {
            let (_, store) = memory_store().await;
            let merger = store.backlinks();
            let mut id = String::new();
            for (source, text) in &merges {
                let link = BackLink::new(text.clone(), format!("https://s{}.org", source));
                id = merger.merge_backlink("https://target.org", link).await.unwrap();
            }
            store.get(&id).await.unwrap().unwrap().page.inferred_data.back_links
        });

        let sources: BTreeSet<&str> = links.iter().map(|l| l.source.as_str()).collect();
        prop_assert_eq!(sources.len(), links.len());

        // every source keeps the text of its most recent merge
        for link in &links {
            let last_text = merges
                .iter()
                .rev()
                .find(|(s, _)| format!("https://s{}.org", s) == link.source)
                .map(|(_, t)| t.clone());
            prop_assert_eq!(Some(link.text.clone()), last_text);
        }
    }
}

#[tokio::test]
async fn test_insert_behind_cursor_is_not_revisited() {
    let (_, store) = memory_store().await;
    store
        .submit_batch(vec![
            PageRecord::new("https://b.org"),
            PageRecord::new("https://d.org"),
            PageRecord::new("https://f.org"),
        ])
        .await
        .unwrap();

    let first = store.scan_all(None, 2).await.unwrap();
    assert_eq!(first.next_after.as_deref(), Some("https://d.org"));

    // one record lands behind the cursor, one ahead of it
    store.submit_page(PageRecord::new("https://a.org")).await.unwrap();
    store.submit_page(PageRecord::new("https://e.org")).await.unwrap();

    let second = store.scan_all(first.next_after.as_deref(), 2).await.unwrap();
    let urls: Vec<&str> = second.records.iter().map(|r| r.page.url()).collect();
    assert_eq!(urls, vec!["https://e.org", "https://f.org"]);

    let third = store.scan_all(second.next_after.as_deref(), 2).await.unwrap();
    assert!(third.records.is_empty());
    assert!(third.is_last());
}
