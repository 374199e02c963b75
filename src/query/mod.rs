//! Query evaluation
//!
//! Query documents themselves are plain data ([`crate::models::Filter`],
//! [`crate::models::SearchRequest`]). This module holds the value types they
//! share (match operators, range bounds, sort clauses) and the matcher the
//! in-process engine evaluates them with.

pub mod matcher;
pub mod types;

pub use matcher::{Matcher, SortValue};
pub use types::*;
