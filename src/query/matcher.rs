//! Filter evaluation against stored JSON documents
//!
//! Used by the in-process engine. Every clause is checked against the index
//! mapping first, so a query naming an unmapped field fails as a whole
//! instead of silently matching nothing.

use ordered_float::OrderedFloat;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

use super::types::{MatchOperator, RangeBounds, SortField, SortOrder};
use crate::error::{Result, StoreError};
use crate::models::{BoolFilter, Filter};
use crate::schema::{FieldType, IndexMapping, ResolvedField};
use crate::tokenizer::Analyzers;

/// Sort value of one document for one sort clause
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Number(OrderedFloat<f64>),
    Text(String),
    /// Document has no value for the field
    Missing,
}

impl SortValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(|v| SortValue::Number(OrderedFloat(v)))
                .unwrap_or(SortValue::Missing),
            Value::String(s) => SortValue::Text(s.clone()),
            Value::Bool(b) => SortValue::Number(OrderedFloat(if *b { 1.0 } else { 0.0 })),
            _ => SortValue::Missing,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SortValue::Number(n) => serde_json::Number::from_f64(n.0)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SortValue::Text(s) => Value::String(s.clone()),
            SortValue::Missing => Value::Null,
        }
    }
}

/// Compare two sort keys clause by clause. Missing values sort last in
/// either direction.
pub fn compare_sort_keys(a: &[SortValue], b: &[SortValue], sort: &[SortField]) -> Ordering {
    for ((x, y), clause) in a.iter().zip(b).zip(sort) {
        let ordering = match (x, y) {
            (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
            (SortValue::Missing, _) => Ordering::Greater,
            (_, SortValue::Missing) => Ordering::Less,
            _ => match clause.order {
                SortOrder::Asc => x.cmp(y),
                SortOrder::Desc => y.cmp(x),
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// All non-null leaf values under a dotted path. Arrays anywhere on the
/// path are flattened.
pub fn values_at<'v>(doc: &'v Value, path: &[&str]) -> Vec<&'v Value> {
    let mut out = Vec::new();
    collect_values(doc, path, &mut out);
    out
}

fn collect_values<'v>(value: &'v Value, path: &[&str], out: &mut Vec<&'v Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_values(item, path, out);
            }
        }
        _ => match path.split_first() {
            None => {
                if !value.is_null() {
                    out.push(value);
                }
            }
            Some((head, rest)) => {
                if let Some(child) = value.get(*head) {
                    collect_values(child, rest, out);
                }
            }
        },
    }
}

/// Copy only the included dotted paths of a source document. A path naming
/// an object copies the whole subtree; a path crossing an array copies the
/// array.
pub fn project_source(doc: &Value, includes: &[String]) -> Value {
    let mut out = Value::Object(Map::new());
    for path in includes {
        let parts: Vec<&str> = path.split('.').collect();
        copy_path(doc, &mut out, &parts);
    }
    out
}

fn copy_path(src: &Value, dst: &mut Value, parts: &[&str]) {
    let Some((head, rest)) = parts.split_first() else {
        return;
    };
    let (Value::Object(src_obj), Value::Object(dst_obj)) = (src, dst) else {
        return;
    };
    let Some(child) = src_obj.get(*head) else {
        return;
    };
    if rest.is_empty() || !child.is_object() {
        dst_obj.insert(head.to_string(), child.clone());
        return;
    }
    let entry = dst_obj
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    copy_path(child, entry, rest);
}

fn query_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn query_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn query_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Evaluates filters and sort keys for documents of one index
pub struct Matcher<'a> {
    index: &'a str,
    mapping: &'a IndexMapping,
    analyzers: &'a Analyzers,
}

impl<'a> Matcher<'a> {
    pub fn new(index: &'a str, mapping: &'a IndexMapping, analyzers: &'a Analyzers) -> Self {
        Self {
            index,
            mapping,
            analyzers,
        }
    }

    fn resolve(&self, field: &str) -> Result<ResolvedField<'a>> {
        self.mapping.resolve(field).ok_or_else(|| {
            StoreError::Query(format!(
                "no mapping found for field [{}] in index [{}]",
                field, self.index
            ))
        })
    }

    fn resolve_value_field(&self, field: &str, clause: &str) -> Result<ResolvedField<'a>> {
        let resolved = self.resolve(field)?;
        if resolved.mapping.field_type.is_structural() {
            return Err(StoreError::Query(format!(
                "[{}] query is not supported on {} field [{}]",
                clause,
                resolved.mapping.field_type.storage_type(),
                field
            )));
        }
        Ok(resolved)
    }

    /// Check every clause against the mapping
    pub fn check(&self, filter: &Filter) -> Result<()> {
        match filter {
            Filter::MatchAll => Ok(()),
            Filter::Exists { field } => self.resolve(field).map(|_| ()),
            Filter::Term { field, .. } => self.resolve_value_field(field, "term").map(|_| ()),
            Filter::Terms { field, .. } => self.resolve_value_field(field, "terms").map(|_| ()),
            Filter::Match { field, .. } => self.resolve_value_field(field, "match").map(|_| ()),
            Filter::Range { field, .. } => {
                let resolved = self.resolve(field)?;
                if !resolved.mapping.field_type.supports_range() {
                    return Err(StoreError::Query(format!(
                        "[range] query is not supported on {} field [{}]",
                        resolved.mapping.field_type.storage_type(),
                        field
                    )));
                }
                Ok(())
            }
            Filter::Bool(b) => b
                .must
                .iter()
                .chain(&b.should)
                .chain(&b.must_not)
                .chain(&b.filter)
                .try_for_each(|clause| self.check(clause)),
        }
    }

    /// Check that every sort clause names a sortable field
    pub fn check_sort(&self, sort: &[SortField]) -> Result<()> {
        for clause in sort {
            let resolved = self.resolve(&clause.field)?;
            if !resolved.mapping.field_type.supports_sorting() {
                return Err(StoreError::Query(format!(
                    "cannot sort on {} field [{}]",
                    resolved.mapping.field_type.storage_type(),
                    clause.field
                )));
            }
        }
        Ok(())
    }

    /// Check that a field can be summed
    pub fn check_numeric(&self, field: &str) -> Result<()> {
        let resolved = self.resolve(field)?;
        if !resolved.mapping.field_type.supports_aggregation() {
            return Err(StoreError::Query(format!(
                "field [{}] of type {} is not supported for aggregation [sum]",
                field,
                resolved.mapping.field_type.storage_type()
            )));
        }
        Ok(())
    }

    fn leaf_values<'v>(&self, field: &str, doc: &'v Value) -> Option<(&'a FieldType, Vec<&'v Value>)> {
        let resolved = self.mapping.resolve(field)?;
        let parts: Vec<&str> = field.split('.').take(resolved.source_depth).collect();
        Some((&resolved.mapping.field_type, values_at(doc, &parts)))
    }

    /// Evaluate a filter. Unmapped fields never match; run [`Matcher::check`]
    /// first to reject them.
    pub fn matches(&self, filter: &Filter, doc: &Value) -> bool {
        match filter {
            Filter::MatchAll => true,
            Filter::Exists { field } => self
                .leaf_values(field, doc)
                .map(|(_, values)| !values.is_empty())
                .unwrap_or(false),
            Filter::Term { field, value } => self.any_value(field, doc, |ft, stored| {
                self.term_matches(ft, stored, value)
            }),
            Filter::Terms { field, values } => self.any_value(field, doc, |ft, stored| {
                values.iter().any(|v| self.term_matches(ft, stored, v))
            }),
            Filter::Range { field, bounds } => {
                self.any_value(field, doc, |ft, stored| range_matches(ft, stored, bounds))
            }
            Filter::Match {
                field,
                query,
                operator,
            } => self.match_query(field, query, *operator, doc),
            Filter::Bool(b) => self.bool_matches(b, doc),
        }
    }

    fn any_value<F>(&self, field: &str, doc: &Value, pred: F) -> bool
    where
        F: Fn(&FieldType, &Value) -> bool,
    {
        match self.leaf_values(field, doc) {
            Some((ft, values)) => values.into_iter().any(|stored| pred(ft, stored)),
            None => false,
        }
    }

    fn bool_matches(&self, b: &BoolFilter, doc: &Value) -> bool {
        if !b.must.iter().chain(&b.filter).all(|c| self.matches(c, doc)) {
            return false;
        }
        if b.must_not.iter().any(|c| self.matches(c, doc)) {
            return false;
        }
        // should is only required when nothing else constrains the match
        if b.must.is_empty() && b.filter.is_empty() && !b.should.is_empty() {
            return b.should.iter().any(|c| self.matches(c, doc));
        }
        true
    }

    fn term_matches(&self, field_type: &FieldType, stored: &Value, query: &Value) -> bool {
        match field_type {
            FieldType::Keyword { ignore_above } => match (stored.as_str(), query_string(query)) {
                (Some(s), Some(q)) => s.chars().count() <= *ignore_above && s == q,
                _ => false,
            },
            FieldType::Text { analyzer } => match (stored.as_str(), query_string(query)) {
                (Some(s), Some(q)) => self.analyzers.get(analyzer).tokenize(s).contains(&q),
                _ => false,
            },
            FieldType::Long
            | FieldType::Double
            | FieldType::Date { .. }
            | FieldType::RankFeature { .. } => match (stored.as_f64(), query_number(query)) {
                (Some(s), Some(q)) => s == q,
                _ => false,
            },
            FieldType::Boolean => match (stored.as_bool(), query_bool(query)) {
                (Some(s), Some(q)) => s == q,
                _ => false,
            },
            FieldType::Object | FieldType::Nested => false,
        }
    }

    fn match_query(&self, field: &str, query: &str, operator: MatchOperator, doc: &Value) -> bool {
        let Some((field_type, values)) = self.leaf_values(field, doc) else {
            return false;
        };
        let FieldType::Text { analyzer } = field_type else {
            let query = Value::String(query.to_string());
            return values
                .into_iter()
                .any(|stored| self.term_matches(field_type, stored, &query));
        };

        let tokenizer = self.analyzers.get(analyzer);
        let query_terms = tokenizer.unique_terms(query);
        if query_terms.is_empty() {
            return false;
        }
        let doc_terms: HashSet<String> = values
            .into_iter()
            .filter_map(Value::as_str)
            .flat_map(|s| tokenizer.tokenize(s))
            .collect();

        match operator {
            MatchOperator::Or => query_terms.iter().any(|t| doc_terms.contains(t)),
            MatchOperator::And => query_terms.iter().all(|t| doc_terms.contains(t)),
        }
    }

    /// Sort key of a document: per clause, the smallest value for ascending
    /// order and the largest for descending order
    pub fn sort_key(&self, sort: &[SortField], doc: &Value) -> Vec<SortValue> {
        sort.iter()
            .map(|clause| {
                let values = self
                    .leaf_values(&clause.field, doc)
                    .map(|(_, values)| values)
                    .unwrap_or_default();
                let keys = values
                    .into_iter()
                    .map(SortValue::from_json)
                    .filter(|v| *v != SortValue::Missing);
                let picked = match clause.order {
                    SortOrder::Asc => keys.min(),
                    SortOrder::Desc => keys.max(),
                };
                picked.unwrap_or(SortValue::Missing)
            })
            .collect()
    }

    /// Numeric values of a field in a document
    pub fn numeric_values(&self, field: &str, doc: &Value) -> Vec<f64> {
        self.leaf_values(field, doc)
            .map(|(_, values)| values.into_iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default()
    }
}

fn range_matches(field_type: &FieldType, stored: &Value, bounds: &RangeBounds) -> bool {
    match field_type {
        FieldType::Keyword { .. } => stored.as_str().map(|s| bounds.contains_str(s)).unwrap_or(false),
        _ => stored.as_f64().map(|v| bounds.contains_f64(v)).unwrap_or(false),
    }
}
