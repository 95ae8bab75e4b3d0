//! Services layer - Business logic
//!
//! This module contains the business logic of the Stockroom service.
//! Services are responsible for:
//! - Validating and normalizing input against a collection schema
//! - Translating query parameters into filters
//! - Coordinating CRUD and paginated queries over the repository

pub mod collection;
pub mod filter;
pub mod validation;

pub use collection::{CollectionRegistry, CollectionService, CollectionServiceError};
pub use filter::{build_filter, FilterError};
pub use validation::{validate_create, validate_update, FieldError, ValidationErrors};
