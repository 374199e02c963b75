//! Persistence and retrieval layer for a web-crawl index.
//!
//! Page records live in a logical collection backed by one or more physical
//! generations. [`DocumentStore`] provides identity-keyed upserts, bulk
//! writes with per-item outcomes, URL lookups, counts, ranked listings and
//! sums. [`CursorPager`] walks the collection in URL order, and
//! [`BacklinkMerger`] folds inbound links into stored records. The engine
//! behind the store is any [`SearchEngine`]; [`MemoryEngine`] runs in
//! process.

pub mod alias;
pub mod backlink;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pager;
pub mod query;
pub mod schema;
pub mod store;
pub mod tokenizer;

pub use alias::AliasManager;
pub use backlink::BacklinkMerger;
pub use config::{Credentials, Endpoint, IndexSettings, StoreConfig, TokenizerConfig};
pub use engine::{MemoryEngine, SearchEngine};
pub use error::{Result, StoreError};
pub use models::*;
pub use pager::{CursorPager, ScanPage};
pub use schema::{page_mapping, FieldMapping, FieldType, IndexMapping};
pub use store::{page_id, DocumentStore};
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
