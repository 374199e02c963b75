use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::page::CrawlerStatus;
use crate::query::types::{MatchOperator, RangeBounds};
use crate::schema::page::fields;

/// Query clause, built as plain data and handed to the engine as-is.
///
/// Serialized in the familiar `{"term": {...}}` shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    MatchAll,

    /// Field has at least one non-null value
    Exists { field: String },

    /// Exact match on a keyword, numeric or boolean field; on a text field
    /// the term must equal one analyzed token
    Term { field: String, value: Value },

    /// Exact match against any of the values
    Terms { field: String, values: Vec<Value> },

    Range { field: String, bounds: RangeBounds },

    /// Full-text match on an analyzed field
    Match {
        field: String,
        query: String,
        #[serde(default)]
        operator: MatchOperator,
    },

    Bool(BoolFilter),
}

/// Boolean combination of clauses.
///
/// `must` and `filter` clauses all have to match, `must_not` clauses must not,
/// and when there is no `must`/`filter` clause at least one `should` clause
/// has to match.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Filter>,
}

impl Filter {
    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists {
            field: field.into(),
        }
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        Filter::Range {
            field: field.into(),
            bounds,
        }
    }

    pub fn matches(field: impl Into<String>, query: impl Into<String>) -> Self {
        Filter::Match {
            field: field.into(),
            query: query.into(),
            operator: MatchOperator::Or,
        }
    }

    pub fn matches_all(field: impl Into<String>, query: impl Into<String>) -> Self {
        Filter::Match {
            field: field.into(),
            query: query.into(),
            operator: MatchOperator::And,
        }
    }

    /// Every clause must match
    pub fn all(clauses: Vec<Filter>) -> Self {
        Filter::Bool(BoolFilter {
            must: clauses,
            ..Default::default()
        })
    }

    /// At least one clause must match
    pub fn any(clauses: Vec<Filter>) -> Self {
        Filter::Bool(BoolFilter {
            should: clauses,
            ..Default::default()
        })
    }

    pub fn not(clause: Filter) -> Self {
        Filter::Bool(BoolFilter {
            must_not: vec![clause],
            ..Default::default()
        })
    }

    /// Record has a non-empty `address.url`
    pub fn has_url() -> Self {
        Filter::Bool(BoolFilter {
            must: vec![Filter::exists(fields::URL)],
            must_not: vec![Filter::term(fields::URL, "")],
            ..Default::default()
        })
    }

    pub fn url(url: impl Into<String>) -> Self {
        Filter::term(fields::URL, url.into())
    }

    pub fn status(status: CrawlerStatus) -> Self {
        Filter::term(fields::CRAWLER_STATUS, status.as_str())
    }

    /// Page body carries at least one internal or external link
    pub fn has_outbound_links() -> Self {
        Filter::any(vec![
            Filter::exists(fields::INTERNAL_LINK_HREF),
            Filter::exists(fields::EXTERNAL_LINK_HREF),
        ])
    }

    /// Page has at least one known backlink
    pub fn has_backlinks() -> Self {
        Filter::exists(fields::BACKLINK_SOURCE)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::MatchAll
    }
}
