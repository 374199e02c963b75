use serde::{Deserialize, Serialize};

use super::url::{domain_of, normalize_url, split_url_to_words};
use crate::error::{Result, StoreError};

/// Version of the page record layout. Stamped into every stored record and
/// into the mapping metadata of every generation built for it.
pub const PAGE_SCHEMA_VERSION: u32 = 2;

/// Storage identifier of a document inside a physical generation
pub type DocumentId = String;

/// Get current Unix timestamp in milliseconds
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Crawl lifecycle of a page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrawlerStatus {
    Crawled,
    #[default]
    NotCrawled,
    AwaitingPagerank,
    DoesNotExist,
    Error,
}

impl CrawlerStatus {
    /// Name as stored in the `crawlerStatus` keyword field
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlerStatus::Crawled => "Crawled",
            CrawlerStatus::NotCrawled => "NotCrawled",
            CrawlerStatus::AwaitingPagerank => "AwaitingPagerank",
            CrawlerStatus::DoesNotExist => "DoesNotExist",
            CrawlerStatus::Error => "Error",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `Error` and `DoesNotExist` are reachable from anywhere and only left by
    /// a retry (`NotCrawled`) or a successful crawl.
    pub fn can_transition_to(&self, next: CrawlerStatus) -> bool {
        use CrawlerStatus::*;
        match (self, next) {
            (_, Error) | (_, DoesNotExist) => true,
            (NotCrawled, Crawled) => true,
            (Crawled, AwaitingPagerank) | (Crawled, Crawled) => true,
            (AwaitingPagerank, Crawled) => true,
            (Error, NotCrawled) | (Error, Crawled) => true,
            (DoesNotExist, NotCrawled) | (DoesNotExist, Crawled) => true,
            (NotCrawled, NotCrawled) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    #[serde(rename = "openGraphImgURL")]
    pub open_graph_img_url: String,
    pub open_graph_title: String,
    pub open_graph_description: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub h4: Vec<String>,
    pub h5: Vec<String>,
    pub h6: Vec<String>,
}

/// Outbound link found in a page body
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardLink {
    pub text: String,
    pub href: String,
}

impl ForwardLink {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyLinks {
    pub internal: Vec<ForwardLink>,
    pub external: Vec<ForwardLink>,
}

impl BodyLinks {
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    pub headings: Headings,
    pub bold_text: Vec<String>,
    pub article: Vec<String>,
    pub links: BodyLinks,
}

/// Inbound link to a page, identified by the linking page (`source`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackLink {
    pub text: String,
    pub source: String,
}

impl BackLink {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ranks {
    pub pagerank: f64,
    /// Rank feature with positive score impact; never negative
    pub smart_rank: f64,
}

impl Default for Ranks {
    fn default() -> Self {
        Self {
            pagerank: 0.0,
            smart_rank: 0.1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InferredData {
    pub back_links: Vec<BackLink>,
    pub ranks: Ranks,
    pub domain_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    /// Exact-match identity key
    pub url: String,
    pub url_as_text: Vec<String>,
    pub host_name: String,
}

impl Address {
    /// Address for a URL, normalized, with its derived text and host fields
    pub fn from_url(url: &str) -> Self {
        let url = normalize_url(url);
        Self {
            url_as_text: split_url_to_words(&url),
            host_name: domain_of(&url),
            url,
        }
    }
}

/// One crawled URL.
///
/// Records are values: every transition below consumes the record and
/// returns the updated one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub body: Body,
    #[serde(default)]
    pub inferred_data: InferredData,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub crawler_timestamp: i64,
    #[serde(default)]
    pub crawler_status: CrawlerStatus,
}

fn default_schema_version() -> u32 {
    PAGE_SCHEMA_VERSION
}

impl Default for PageRecord {
    fn default() -> Self {
        Self {
            schema_version: PAGE_SCHEMA_VERSION,
            metadata: Metadata::default(),
            body: Body::default(),
            inferred_data: InferredData::default(),
            address: Address::default(),
            crawler_timestamp: current_timestamp_millis(),
            crawler_status: CrawlerStatus::NotCrawled,
        }
    }
}

impl PageRecord {
    /// Bare record for a URL the crawler has not visited yet
    pub fn new(url: &str) -> Self {
        let address = Address::from_url(url);
        let inferred_data = InferredData {
            domain_name: domain_of(&address.url),
            ..InferredData::default()
        };
        Self {
            address,
            inferred_data,
            ..Self::default()
        }
    }

    pub fn url(&self) -> &str {
        &self.address.url
    }

    /// Check the constraints the store enforces before a write
    pub fn validate(&self) -> Result<()> {
        if self.address.url.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "address.url is required".to_string(),
            ));
        }
        let ranks = &self.inferred_data.ranks;
        if !ranks.pagerank.is_finite() {
            return Err(StoreError::InvalidRecord(format!(
                "pagerank must be finite, got {}",
                ranks.pagerank
            )));
        }
        if !ranks.smart_rank.is_finite() || ranks.smart_rank < 0.0 {
            return Err(StoreError::InvalidRecord(format!(
                "smartRank must be a non-negative number, got {}",
                ranks.smart_rank
            )));
        }
        Ok(())
    }

    /// Normalize `address.url` and fill the fields derived from it when the
    /// producer left them empty
    pub fn normalized(mut self) -> Self {
        let url = normalize_url(&self.address.url);
        if url != self.address.url || self.address.url_as_text.is_empty() {
            self.address.url_as_text = split_url_to_words(&url);
        }
        if self.address.host_name.is_empty() {
            self.address.host_name = domain_of(&url);
        }
        self.address.url = url;
        self
    }

    /// Stamp the write time. The stamp never moves backwards.
    pub fn stamped(mut self, now_millis: i64) -> Self {
        self.crawler_timestamp = self.crawler_timestamp.max(now_millis);
        self.schema_version = PAGE_SCHEMA_VERSION;
        self
    }

    /// Move to another crawler status, checked against the lifecycle
    pub fn with_status(mut self, status: CrawlerStatus) -> Result<Self> {
        if !self.crawler_status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: self.crawler_status,
                to: status,
            });
        }
        self.crawler_status = status;
        Ok(self)
    }

    /// Fill in crawled content and mark the page `Crawled`
    pub fn with_content(mut self, metadata: Metadata, body: Body) -> Result<Self> {
        self.metadata = metadata;
        self.body = body;
        self.with_status(CrawlerStatus::Crawled)
    }

    pub fn with_ranks(mut self, ranks: Ranks) -> Result<Self> {
        if !ranks.smart_rank.is_finite() || ranks.smart_rank < 0.0 {
            return Err(StoreError::InvalidRecord(format!(
                "smartRank must be a non-negative number, got {}",
                ranks.smart_rank
            )));
        }
        self.inferred_data.ranks = ranks;
        Ok(self)
    }

    /// Fold an inbound link into `backLinks`. An entry with the same source
    /// is replaced in place; a new source is appended.
    pub fn with_backlink(mut self, link: BackLink) -> Self {
        let back_links = &mut self.inferred_data.back_links;
        match back_links.iter().position(|l| l.source == link.source) {
            Some(pos) => back_links[pos] = link,
            None => back_links.push(link),
        }
        self
    }

    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.inferred_data.domain_name = domain_name.into();
        self
    }

    /// Whether the page has any outbound link
    pub fn has_outbound_links(&self) -> bool {
        !self.body.links.is_empty()
    }
}
