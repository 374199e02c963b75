use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::filter::Filter;
use super::page::DocumentId;
use super::search::{SearchRequest, SearchResponse, StoredPage};
use crate::config::IndexSettings;
use crate::error::StoreError;
use crate::schema::IndexMapping;

/// Request understood by the storage engine's `execute` entry point
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EngineRequest {
    CreateIndex {
        index: String,
        settings: IndexSettings,
        mapping: IndexMapping,
    },
    DeleteIndex {
        index: String,
    },
    PutAlias {
        index: String,
        alias: String,
    },
    DeleteAlias {
        index: String,
        alias: String,
    },
    GetAlias {
        alias: String,
    },
    Index {
        index: String,
        id: Option<DocumentId>,
        document: Value,
    },
    Get {
        index: String,
        id: DocumentId,
    },
    Count {
        index: String,
        query: Filter,
    },
    Sum {
        index: String,
        field: String,
        query: Filter,
    },
    MultiSearch(Vec<SearchRequest>),
}

impl EngineRequest {
    /// Get a human-readable name for this request (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            EngineRequest::CreateIndex { .. } => "CreateIndex",
            EngineRequest::DeleteIndex { .. } => "DeleteIndex",
            EngineRequest::PutAlias { .. } => "PutAlias",
            EngineRequest::DeleteAlias { .. } => "DeleteAlias",
            EngineRequest::GetAlias { .. } => "GetAlias",
            EngineRequest::Index { .. } => "Index",
            EngineRequest::Get { .. } => "Get",
            EngineRequest::Count { .. } => "Count",
            EngineRequest::Sum { .. } => "Sum",
            EngineRequest::MultiSearch(_) => "MultiSearch",
        }
    }

    /// Check if this request modifies documents or index metadata
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            EngineRequest::CreateIndex { .. }
                | EngineRequest::DeleteIndex { .. }
                | EngineRequest::PutAlias { .. }
                | EngineRequest::DeleteAlias { .. }
                | EngineRequest::Index { .. }
        )
    }
}

/// Response to an [`EngineRequest`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EngineResponse {
    Acknowledged,
    Indexed(WriteAck),
    Document(Option<super::search::SearchHit>),
    Count(u64),
    Sum(f64),
    /// Physical indices bound to an alias, in binding order; empty when the
    /// alias does not exist
    Aliases(Vec<String>),
    MultiSearch(Vec<SubSearchResult>),
}

/// Outcome of one sub-query of a multi-search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SubSearchResult {
    Ok(SearchResponse),
    Err(ItemError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteResult {
    Created,
    Updated,
}

/// Acknowledgement of one document write
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteAck {
    pub index: String,
    pub id: DocumentId,
    pub result: WriteResult,
    pub version: u64,
}

/// One write inside a bulk request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BulkOperation {
    Index {
        index: String,
        id: Option<DocumentId>,
        document: Value,
    },
}

/// Per-item bulk result as reported by the engine, in request order
pub type BulkItemResult = std::result::Result<WriteAck, ItemError>;

/// Failure of a single item (bulk write or multi-search sub-query)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub kind: String,
    pub reason: String,
}

impl ItemError {
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

impl From<&StoreError> for ItemError {
    fn from(err: &StoreError) -> Self {
        ItemError::new(err.kind(), err.to_string())
    }
}

impl From<StoreError> for ItemError {
    fn from(err: StoreError) -> Self {
        ItemError::from(&err)
    }
}

/// Outcome of one record of a caller-supplied batch.
///
/// `position` is the zero-based position of the record in the batch.
#[derive(Clone, Debug, PartialEq)]
pub enum BulkItemOutcome {
    Stored { position: usize, id: DocumentId },
    Failed { position: usize, error: ItemError },
}

impl BulkItemOutcome {
    pub fn position(&self) -> usize {
        match self {
            BulkItemOutcome::Stored { position, .. } | BulkItemOutcome::Failed { position, .. } => {
                *position
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BulkItemOutcome::Stored { .. })
    }

    pub fn id(&self) -> Option<&DocumentId> {
        match self {
            BulkItemOutcome::Stored { id, .. } => Some(id),
            BulkItemOutcome::Failed { .. } => None,
        }
    }
}

/// Per-item outcomes of a bulk upsert, in input order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BulkReport {
    pub outcomes: Vec<BulkItemOutcome>,
}

impl BulkReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &BulkItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Matches for one URL of a bulk lookup
#[derive(Clone, Debug, PartialEq)]
pub struct UrlLookup {
    pub url: String,
    pub result: std::result::Result<Vec<StoredPage>, ItemError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_name() {
        let req = EngineRequest::GetAlias {
            alias: "pages".to_string(),
        };
        assert_eq!(req.name(), "GetAlias");
        assert!(!req.is_write());

        let req = EngineRequest::DeleteIndex {
            index: "pages-v1".to_string(),
        };
        assert!(req.is_write());
    }

    #[test]
    fn test_bulk_report_counts() {
        let report = BulkReport {
            outcomes: vec![
                BulkItemOutcome::Stored {
                    position: 0,
                    id: "a".to_string(),
                },
                BulkItemOutcome::Failed {
                    position: 1,
                    error: ItemError::new("invalid_record", "address.url is required"),
                },
                BulkItemOutcome::Stored {
                    position: 2,
                    id: "c".to_string(),
                },
            ],
        };
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert_eq!(report.failures().next().map(|o| o.position()), Some(1));
    }

    #[test]
    fn test_item_error_from_store_error() {
        let err = StoreError::Unavailable("connection reset".to_string());
        let item = ItemError::from(&err);
        assert_eq!(item.kind, "store_unavailable");
        assert!(item.reason.contains("connection reset"));
    }
}
