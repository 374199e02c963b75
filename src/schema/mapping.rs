//! Index mapping definitions
//!
//! Mappings define the schema for an index, including field types and indexing options.
//! They are plain nested data and serialize to the usual
//! `{"properties": {"field": {"type": ...}}}` document.

use super::field_type::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Dynamic mapping behavior for unmapped fields
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicMapping {
    /// Automatically detect and map new fields (default)
    #[default]
    True,
    /// Keep unmapped fields in the source without indexing them
    False,
    /// Reject documents with unmapped fields
    Strict,
}

impl DynamicMapping {
    /// Check if new fields should be automatically mapped
    pub fn should_auto_map(&self) -> bool {
        matches!(self, DynamicMapping::True)
    }

    /// Check if unmapped fields should cause an error
    pub fn should_reject_unmapped(&self) -> bool {
        matches!(self, DynamicMapping::Strict)
    }
}

/// Field mapping configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,

    /// Whether to index this field (default: true)
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub index: bool,

    /// Multi-fields: the same source value indexed a second way
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldMapping>,

    /// Nested field mappings (for object and nested types)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, FieldMapping>,
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::new(FieldType::default())
    }
}

impl FieldMapping {
    /// Create a new field mapping with the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            index: true,
            fields: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Create a text field mapping
    pub fn text() -> Self {
        Self::new(FieldType::text())
    }

    /// Create a keyword field mapping
    pub fn keyword() -> Self {
        Self::new(FieldType::keyword())
    }

    pub fn keyword_with_limit(ignore_above: usize) -> Self {
        Self::new(FieldType::keyword_with_limit(ignore_above))
    }

    /// Create a long field mapping
    pub fn long() -> Self {
        Self::new(FieldType::Long)
    }

    /// Create a double field mapping
    pub fn double() -> Self {
        Self::new(FieldType::Double)
    }

    /// Create a boolean field mapping
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Create a date field mapping
    pub fn date() -> Self {
        Self::new(FieldType::date())
    }

    /// Numeric value stored as a double with a `rankFeature` sub-field, so it
    /// can be sorted and aggregated and also feed the score
    pub fn rank() -> Self {
        Self::double().with_field("rankFeature", Self::new(FieldType::rank_feature()))
    }

    /// Create an object mapping from its properties
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldMapping)>,
        K: Into<String>,
    {
        Self::new(FieldType::Object).with_properties(properties)
    }

    /// Create a nested mapping from its properties
    pub fn nested<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldMapping)>,
        K: Into<String>,
    {
        Self::new(FieldType::Nested).with_properties(properties)
    }

    /// Set whether the field should be indexed
    pub fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    /// Add a multi-field
    pub fn with_field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.fields.insert(name.into(), mapping);
        self
    }

    /// Set nested field properties (for object types)
    pub fn with_properties<I, K>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldMapping)>,
        K: Into<String>,
    {
        self.properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        self
    }

    fn validate_value(
        &self,
        value: &Value,
        path: &str,
        dynamic: DynamicMapping,
    ) -> Result<(), String> {
        match value {
            Value::Null => Ok(()),
            Value::Array(items) => items
                .iter()
                .try_for_each(|item| self.validate_value(item, path, dynamic)),
            _ if self.field_type.is_structural() => match value {
                Value::Object(obj) => validate_object(&self.properties, obj, path, dynamic),
                _ => Err(format!(
                    "failed to parse field [{}]: {} field requires an object value",
                    path,
                    self.field_type.storage_type()
                )),
            },
            _ => {
                self.field_type
                    .validate(value)
                    .map_err(|e| format!("failed to parse field [{}]: {}", path, e))?;
                for (name, sub) in &self.fields {
                    sub.validate_value(value, &format!("{}.{}", path, name), dynamic)?;
                }
                Ok(())
            }
        }
    }
}

/// A field located by dotted path
#[derive(Clone, Copy, Debug)]
pub struct ResolvedField<'a> {
    pub mapping: &'a FieldMapping,
    /// Number of leading path segments that address the source document.
    /// Shorter than the path when the path ends in a multi-field.
    pub source_depth: usize,
}

/// Index mapping (schema) definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMapping {
    /// Field mappings
    #[serde(default)]
    pub properties: BTreeMap<String, FieldMapping>,

    /// Dynamic mapping behavior
    #[serde(default)]
    pub dynamic: DynamicMapping,

    /// Free-form metadata stored with the mapping
    #[serde(rename = "_meta", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl IndexMapping {
    /// Create a new empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping with strict mode
    pub fn strict() -> Self {
        Self {
            dynamic: DynamicMapping::Strict,
            ..Default::default()
        }
    }

    /// Add a field mapping
    pub fn field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.properties.insert(name.into(), mapping);
        self
    }

    /// Set dynamic mapping behavior
    pub fn with_dynamic(mut self, dynamic: DynamicMapping) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Locate a field by dotted path, including multi-fields
    /// (`inferredData.ranks.pagerank.rankFeature`)
    pub fn resolve(&self, path: &str) -> Option<ResolvedField<'_>> {
        let parts: Vec<&str> = path.split('.').collect();
        let mut props = &self.properties;
        let mut current: Option<&FieldMapping> = None;

        for (depth, part) in parts.iter().enumerate() {
            if let Some(field) = props.get(*part) {
                current = Some(field);
                props = &field.properties;
                continue;
            }
            // A multi-field can only be the last segment
            let parent = current?;
            if depth + 1 != parts.len() {
                return None;
            }
            let sub = parent.fields.get(*part)?;
            return Some(ResolvedField {
                mapping: sub,
                source_depth: depth,
            });
        }

        current.map(|mapping| ResolvedField {
            mapping,
            source_depth: parts.len(),
        })
    }

    /// Get a field mapping by path (supports dot notation)
    pub fn get_field(&self, path: &str) -> Option<&FieldMapping> {
        self.resolve(path).map(|r| r.mapping)
    }

    /// Check if a field exists
    pub fn has_field(&self, path: &str) -> bool {
        self.get_field(path).is_some()
    }

    /// Get all field names (flattened with dot notation, multi-fields included)
    pub fn field_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_field_names(&self.properties, "", &mut names);
        names
    }

    /// Check a document against the mapping.
    ///
    /// Type mismatches and negative rank features are rejected; unmapped
    /// fields are rejected only under strict dynamic mapping.
    pub fn validate_document(&self, doc: &Value) -> Result<(), String> {
        match doc {
            Value::Object(obj) => validate_object(&self.properties, obj, "", self.dynamic),
            _ => Err("document must be a JSON object".to_string()),
        }
    }

    /// Add mappings for fields of `doc` not mapped yet. No-op unless the
    /// mapping is dynamic.
    pub fn merge_dynamic(&mut self, doc: &Value) {
        if !self.dynamic.should_auto_map() {
            return;
        }
        if let Value::Object(obj) = doc {
            merge_object(&mut self.properties, obj);
        }
    }

    /// Auto-detect a field mapping from a JSON value. `None` for values that
    /// carry no type (null, empty arrays).
    pub fn detect_field_mapping(value: &Value) -> Option<FieldMapping> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(FieldMapping::boolean()),
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Some(FieldMapping::long())
                } else {
                    Some(FieldMapping::double())
                }
            }
            Value::String(_) => Some(FieldMapping::text().with_field("keyword", FieldMapping::keyword())),
            Value::Array(arr) => arr.iter().find_map(Self::detect_field_mapping),
            Value::Object(obj) => {
                let mut properties = BTreeMap::new();
                merge_object(&mut properties, obj);
                Some(FieldMapping::new(FieldType::Object).with_properties(properties))
            }
        }
    }
}

fn collect_field_names(props: &BTreeMap<String, FieldMapping>, prefix: &str, names: &mut Vec<String>) {
    for (name, mapping) in props {
        let full_name = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };

        names.push(full_name.clone());
        for sub in mapping.fields.keys() {
            names.push(format!("{}.{}", full_name, sub));
        }
        collect_field_names(&mapping.properties, &full_name, names);
    }
}

fn validate_object(
    props: &BTreeMap<String, FieldMapping>,
    obj: &Map<String, Value>,
    prefix: &str,
    dynamic: DynamicMapping,
) -> Result<(), String> {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match props.get(key) {
            Some(mapping) => mapping.validate_value(value, &path, dynamic)?,
            None if dynamic.should_reject_unmapped() => {
                return Err(format!(
                    "mapping set to strict, dynamic introduction of [{}] is not allowed",
                    path
                ));
            }
            None => {}
        }
    }
    Ok(())
}

fn merge_object(props: &mut BTreeMap<String, FieldMapping>, obj: &Map<String, Value>) {
    for (key, value) in obj {
        match props.get_mut(key) {
            Some(existing) if existing.field_type.is_structural() => {
                let objects: Vec<&Map<String, Value>> = match value {
                    Value::Object(o) => vec![o],
                    Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
                    _ => Vec::new(),
                };
                for o in objects {
                    merge_object(&mut existing.properties, o);
                }
            }
            Some(_) => {}
            None => {
                if let Some(mapping) = IndexMapping::detect_field_mapping(value) {
                    props.insert(key.clone(), mapping);
                }
            }
        }
    }
}
