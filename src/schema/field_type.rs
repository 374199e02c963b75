//! Field type definitions
//!
//! Defines how different data types are indexed and queried.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field data type
///
/// Determines how a field is indexed, stored, and queried. Serialized as the
/// `type` key of the field mapping plus its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Full-text searchable field
    ///
    /// Text fields are analyzed (tokenized, lowercased, optionally stemmed)
    /// before indexing and support `match` queries.
    Text {
        #[serde(default = "default_analyzer")]
        analyzer: String,
    },

    /// Exact match keyword field
    ///
    /// The entire value is indexed as a single term. Values longer than
    /// `ignore_above` bytes are kept in the source but not indexed.
    Keyword {
        #[serde(default = "default_ignore_above")]
        ignore_above: usize,
    },

    /// 64-bit signed integer
    Long,

    /// 64-bit floating point
    Double,

    Boolean,

    /// Date/time field, stored as Unix timestamp (milliseconds)
    Date {
        #[serde(default = "default_date_format")]
        format: String,
    },

    /// Numeric feature that only ever raises a document's score
    RankFeature {
        #[serde(default = "default_true")]
        positive_score_impact: bool,
    },

    /// Plain object with its own field mappings
    Object,

    /// Array of objects whose members are indexed as separate documents
    Nested,
}

fn default_analyzer() -> String {
    "standard".to_string()
}

fn default_true() -> bool {
    true
}

fn default_ignore_above() -> usize {
    256
}

fn default_date_format() -> String {
    "epoch_millis".to_string()
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::text()
    }
}

impl FieldType {
    /// Create a text field with the standard analyzer
    pub fn text() -> Self {
        FieldType::Text {
            analyzer: default_analyzer(),
        }
    }

    /// Create a text field with a specific analyzer
    pub fn text_with_analyzer(analyzer: impl Into<String>) -> Self {
        FieldType::Text {
            analyzer: analyzer.into(),
        }
    }

    /// Create a keyword field with default settings
    pub fn keyword() -> Self {
        FieldType::Keyword {
            ignore_above: default_ignore_above(),
        }
    }

    pub fn keyword_with_limit(ignore_above: usize) -> Self {
        FieldType::Keyword { ignore_above }
    }

    /// Create a date field with default format
    pub fn date() -> Self {
        FieldType::Date {
            format: default_date_format(),
        }
    }

    pub fn rank_feature() -> Self {
        FieldType::RankFeature {
            positive_score_impact: true,
        }
    }

    /// Check if this field type supports full-text queries
    pub fn supports_fulltext(&self) -> bool {
        matches!(self, FieldType::Text { .. })
    }

    /// Check if this field type supports exact match queries
    pub fn supports_exact_match(&self) -> bool {
        matches!(
            self,
            FieldType::Keyword { .. }
                | FieldType::Long
                | FieldType::Double
                | FieldType::Boolean
                | FieldType::Date { .. }
        )
    }

    /// Check if this field type supports range queries
    pub fn supports_range(&self) -> bool {
        matches!(
            self,
            FieldType::Keyword { .. } | FieldType::Long | FieldType::Double | FieldType::Date { .. }
        )
    }

    /// Check if this field type supports aggregations
    pub fn supports_aggregation(&self) -> bool {
        self.is_numeric()
    }

    /// Check if this field type supports sorting
    pub fn supports_sorting(&self) -> bool {
        matches!(
            self,
            FieldType::Keyword { .. }
                | FieldType::Long
                | FieldType::Double
                | FieldType::Boolean
                | FieldType::Date { .. }
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Long | FieldType::Double | FieldType::Date { .. }
        )
    }

    /// Whether the field holds sub-fields rather than a value
    pub fn is_structural(&self) -> bool {
        matches!(self, FieldType::Object | FieldType::Nested)
    }

    /// Get the internal storage type name
    pub fn storage_type(&self) -> &'static str {
        match self {
            FieldType::Text { .. } => "text",
            FieldType::Keyword { .. } => "keyword",
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Date { .. } => "date",
            FieldType::RankFeature { .. } => "rank_feature",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
        }
    }

    /// Validate a single (non-array) value against this field type
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            FieldType::Text { .. } | FieldType::Keyword { .. } => {
                if !value.is_string() {
                    return Err(format!(
                        "{} field requires a string value",
                        self.storage_type()
                    ));
                }
            }
            FieldType::Long => {
                if !value.is_i64() && !value.is_u64() {
                    return Err("long field requires an integer value".to_string());
                }
            }
            FieldType::Double => {
                if !value.is_number() {
                    return Err("double field requires a numeric value".to_string());
                }
            }
            FieldType::Boolean => {
                if !value.is_boolean() {
                    return Err("boolean field requires a boolean value".to_string());
                }
            }
            FieldType::Date { .. } => {
                if !value.is_i64() && !value.is_u64() {
                    return Err("date field requires epoch milliseconds".to_string());
                }
            }
            FieldType::RankFeature { .. } => match value.as_f64() {
                Some(v) if v.is_finite() && v >= 0.0 => {}
                Some(v) => {
                    return Err(format!("rank_feature value must be non-negative, got {}", v));
                }
                None => return Err("rank_feature field requires a numeric value".to_string()),
            },
            FieldType::Object | FieldType::Nested => {
                if !value.is_object() {
                    return Err(format!(
                        "{} field requires an object value",
                        self.storage_type()
                    ));
                }
            }
        }
        Ok(())
    }
}
