//! Data models
//!
//! This module contains the data structures shared across the Stockroom service:
//! - Typed field values and document identifiers
//! - Entity schema descriptors
//! - Stored documents
//! - Query primitives (filters, sorting, pagination)

mod document;
mod query;
mod schema;
mod value;

pub use document::{Document, FieldValues};
pub use query::{Filter, PageRequest, PageResult, Predicate, SortDirection, SortSpec};
pub use schema::{
    ComputedField, EntitySchema, Fallback, FieldKind, FieldSpec, FilterSpec, Limit, Presence, Rule,
};
pub use value::{DocumentId, InvalidDocumentId, Value};
