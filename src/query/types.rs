//! Core types for the query system

use serde::{Deserialize, Serialize};

/// Operator for combining terms in a match query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    /// All terms must match (AND)
    And,
    /// At least one term must match (OR)
    #[default]
    Or,
}

/// Value type for range queries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeValue {
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// String (keywords, or numbers written as text)
    String(String),
}

impl RangeValue {
    /// Convert to f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RangeValue::Long(v) => Some(*v as f64),
            RangeValue::Double(v) => Some(*v),
            RangeValue::String(s) => s.parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RangeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Range bounds for range queries
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Greater than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<RangeValue>,
    /// Greater than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<RangeValue>,
    /// Less than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<RangeValue>,
    /// Less than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<RangeValue>,
}

impl RangeBounds {
    pub fn gte(mut self, value: RangeValue) -> Self {
        self.gte = Some(value);
        self
    }

    pub fn gt(mut self, value: RangeValue) -> Self {
        self.gt = Some(value);
        self
    }

    pub fn lte(mut self, value: RangeValue) -> Self {
        self.lte = Some(value);
        self
    }

    pub fn lt(mut self, value: RangeValue) -> Self {
        self.lt = Some(value);
        self
    }

    /// Check if a float value is within this range
    pub fn contains_f64(&self, value: f64) -> bool {
        if let Some(bound) = self.gte.as_ref().and_then(RangeValue::as_f64) {
            if value < bound {
                return false;
            }
        }
        if let Some(bound) = self.gt.as_ref().and_then(RangeValue::as_f64) {
            if value <= bound {
                return false;
            }
        }
        if let Some(bound) = self.lte.as_ref().and_then(RangeValue::as_f64) {
            if value > bound {
                return false;
            }
        }
        if let Some(bound) = self.lt.as_ref().and_then(RangeValue::as_f64) {
            if value >= bound {
                return false;
            }
        }
        true
    }

    /// Check if a keyword value is within this range (byte-wise order)
    pub fn contains_str(&self, value: &str) -> bool {
        if let Some(bound) = self.gte.as_ref().and_then(RangeValue::as_str) {
            if value < bound {
                return false;
            }
        }
        if let Some(bound) = self.gt.as_ref().and_then(RangeValue::as_str) {
            if value <= bound {
                return false;
            }
        }
        if let Some(bound) = self.lte.as_ref().and_then(RangeValue::as_str) {
            if value > bound {
                return false;
            }
        }
        if let Some(bound) = self.lt.as_ref().and_then(RangeValue::as_str) {
            if value >= bound {
                return false;
            }
        }
        true
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One sort clause. Documents missing the field sort last in either order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}
