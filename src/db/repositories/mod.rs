//! Database repositories
//!
//! Repository pattern implementations for database access.
//! A single schema-driven repository serves every collection.

pub mod document;

pub use document::{DocumentRepository, SqlxDocumentRepository};
