//! Mapping of the page record
//!
//! Full-text fields use the `english` analyzer, identity and tag fields are
//! keywords with a token length cap, `smartRank` is a double carrying a
//! `rankFeature` sub-field, and link lists are nested. `pagerank` has no
//! sign constraint so it stays a plain double.

use super::mapping::{DynamicMapping, FieldMapping, IndexMapping};
use crate::config::IndexSettings;
use crate::models::{EngineRequest, PAGE_SCHEMA_VERSION};

/// Dotted paths of the fields the store queries on
pub mod fields {
    pub const URL: &str = "address.url";
    pub const URL_AS_TEXT: &str = "address.urlAsText";
    pub const HOST_NAME: &str = "address.hostName";
    pub const CRAWLER_STATUS: &str = "crawlerStatus";
    pub const CRAWLER_TIMESTAMP: &str = "crawlerTimestamp";
    pub const INTERNAL_LINK_HREF: &str = "body.links.internal.href";
    pub const EXTERNAL_LINK_HREF: &str = "body.links.external.href";
    pub const BACKLINK_SOURCE: &str = "inferredData.backLinks.source";
    pub const DOMAIN_NAME: &str = "inferredData.domainName";
    pub const PAGERANK: &str = "inferredData.ranks.pagerank";
    pub const SMART_RANK: &str = "inferredData.ranks.smartRank";
}

/// Longest URL indexed as an exact-match term
pub const URL_IGNORE_ABOVE: usize = 2048;

const ANALYZER: &str = "english";

fn full_text() -> FieldMapping {
    FieldMapping::new(super::FieldType::text_with_analyzer(ANALYZER))
}

fn link_list(target: &str) -> FieldMapping {
    FieldMapping::nested([("text", full_text()), (target, FieldMapping::keyword_with_limit(URL_IGNORE_ABOVE))])
}

/// Build the mapping every page generation is created with
pub fn page_mapping() -> IndexMapping {
    let address = FieldMapping::object([
        ("url", FieldMapping::keyword_with_limit(URL_IGNORE_ABOVE)),
        ("urlAsText", full_text()),
        ("hostName", FieldMapping::keyword()),
    ]);

    let metadata = FieldMapping::object([
        ("title", full_text()),
        ("description", full_text()),
        ("openGraphImgURL", FieldMapping::keyword_with_limit(URL_IGNORE_ABOVE)),
        ("openGraphTitle", full_text()),
        ("openGraphDescription", full_text()),
        ("type", FieldMapping::keyword()),
        ("tags", FieldMapping::keyword()),
    ]);

    let headings = FieldMapping::object(
        ["h1", "h2", "h3", "h4", "h5", "h6"]
            .into_iter()
            .map(|h| (h, full_text())),
    );

    let body = FieldMapping::object([
        ("headings", headings),
        ("boldText", full_text()),
        ("article", full_text()),
        (
            "links",
            FieldMapping::object([("internal", link_list("href")), ("external", link_list("href"))]),
        ),
    ]);

    let inferred_data = FieldMapping::object([
        ("backLinks", link_list("source")),
        (
            "ranks",
            FieldMapping::object([("pagerank", FieldMapping::double()), ("smartRank", FieldMapping::rank())]),
        ),
        ("domainName", FieldMapping::keyword()),
    ]);

    IndexMapping::new()
        .with_dynamic(DynamicMapping::Strict)
        .with_meta("schema_version", PAGE_SCHEMA_VERSION)
        .field("schemaVersion", FieldMapping::long())
        .field("address", address)
        .field("metadata", metadata)
        .field("body", body)
        .field("inferredData", inferred_data)
        .field("crawlerStatus", FieldMapping::keyword())
        .field("crawlerTimestamp", FieldMapping::date())
}

/// Request creating one physical page generation
pub fn create_generation_request(index: impl Into<String>, settings: IndexSettings) -> EngineRequest {
    EngineRequest::CreateIndex {
        index: index.into(),
        settings,
        mapping: page_mapping(),
    }
}
