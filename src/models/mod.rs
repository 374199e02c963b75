pub mod command;
pub mod filter;
pub mod page;
pub mod search;
pub mod url;

pub use command::{
    BulkItemOutcome, BulkItemResult, BulkOperation, BulkReport, EngineRequest, EngineResponse,
    ItemError, SubSearchResult, UrlLookup, WriteAck, WriteResult,
};
pub use filter::{BoolFilter, Filter};
pub use page::{
    current_timestamp_millis, Address, BackLink, Body, BodyLinks, CrawlerStatus, DocumentId,
    ForwardLink, Headings, InferredData, Metadata, PageRecord, Ranks, PAGE_SCHEMA_VERSION,
};
pub use search::{SearchHit, SearchRequest, SearchResponse, StoredPage};
