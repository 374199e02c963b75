//! Schema and field type system
//!
//! This module defines the schema system, including:
//! - Field types (Text, Keyword, Long, Double, Boolean, Date, RankFeature, Object, Nested)
//! - Index mappings (field configuration, multi-fields, dynamic behavior)
//! - The page record mapping every generation is created with

mod field_type;
mod mapping;
pub mod page;

pub use field_type::FieldType;
pub use mapping::{DynamicMapping, FieldMapping, IndexMapping, ResolvedField};
pub use page::{create_generation_request, page_mapping};
