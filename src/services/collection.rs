//! Collection service
//!
//! Implements the operations exposed for every collection:
//! - Create, read, update, delete single documents
//! - Paginated listing with optional sort
//! - Filtered search
//!
//! All behaviour is driven by the collection's [`EntitySchema`]; the service
//! holds no per-collection code.

use serde_json::{Map, Value as Json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::db::is_unavailable;
use crate::db::repositories::DocumentRepository;
use crate::models::{
    Document, DocumentId, EntitySchema, Filter, PageRequest, PageResult, SortSpec,
};
use crate::services::filter::{build_filter, FilterError};
use crate::services::validation::{validate_create, validate_update, ValidationErrors};

/// Error types for collection service operations
#[derive(Debug, thiserror::Error)]
pub enum CollectionServiceError {
    /// One or more fields failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Identifier is not 24 hexadecimal characters
    #[error("Invalid {entity} ID format")]
    InvalidIdentifier { entity: &'static str, id: String },

    /// No document with the given identifier
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Update carried no usable fields
    #[error("No fields provided for update")]
    NoFieldsProvided,

    /// A range filter's upper bound is below its lower bound
    #[error("{max_param} cannot be less than {min_param}")]
    InvalidRange {
        min_param: &'static str,
        max_param: &'static str,
    },

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(anyhow::Error),

    /// Anything else
    #[error("Unexpected error: {0}")]
    Unexpected(anyhow::Error),
}

impl From<anyhow::Error> for CollectionServiceError {
    fn from(error: anyhow::Error) -> Self {
        if is_unavailable(&error) {
            CollectionServiceError::StoreUnavailable(error)
        } else {
            CollectionServiceError::Unexpected(error)
        }
    }
}

impl From<ValidationErrors> for CollectionServiceError {
    fn from(errors: ValidationErrors) -> Self {
        CollectionServiceError::Validation(errors)
    }
}

impl From<FilterError> for CollectionServiceError {
    fn from(error: FilterError) -> Self {
        match error {
            FilterError::Invalid(errors) => CollectionServiceError::Validation(errors),
            FilterError::InvalidRange {
                min_param,
                max_param,
            } => CollectionServiceError::InvalidRange {
                min_param,
                max_param,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectionServiceError>;

/// CRUD and query operations for one collection
pub struct CollectionService {
    schema: &'static EntitySchema,
    repo: Arc<dyn DocumentRepository>,
    max_page_size: u32,
}

impl CollectionService {
    /// Create a new collection service
    pub fn new(
        schema: &'static EntitySchema,
        repo: Arc<dyn DocumentRepository>,
        max_page_size: u32,
    ) -> Self {
        Self {
            schema,
            repo,
            max_page_size,
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Parse a client-supplied identifier
    pub fn parse_id(&self, raw: &str) -> Result<DocumentId> {
        raw.parse()
            .map_err(|_| CollectionServiceError::InvalidIdentifier {
                entity: self.schema.entity_name,
                id: raw.to_string(),
            })
    }

    async fn load(&self, id: &DocumentId) -> Result<Document> {
        self.repo
            .find_by_id(self.schema, id)
            .await?
            .ok_or_else(|| CollectionServiceError::NotFound {
                entity: self.schema.entity_name,
                id: id.to_string(),
            })
    }

    /// Validate and store a new document
    pub async fn create(&self, input: &Map<String, Json>) -> Result<Document> {
        let fields = validate_create(self.schema, input)?;
        let document = Document::new(DocumentId::generate(), fields);

        self.repo.insert(self.schema, &document).await?;

        tracing::info!(
            collection = self.schema.collection,
            id = %document.id,
            "Created {}",
            self.schema.entity_name
        );
        Ok(document)
    }

    /// Get document by ID
    pub async fn get(&self, raw_id: &str) -> Result<Document> {
        let id = self.parse_id(raw_id)?;
        self.load(&id).await
    }

    /// Apply a partial update and return the reloaded document
    pub async fn update(&self, raw_id: &str, input: &Map<String, Json>) -> Result<Document> {
        let id = self.parse_id(raw_id)?;
        self.load(&id).await?;

        let changes = validate_update(self.schema, input)?;
        if changes.is_empty() {
            return Err(CollectionServiceError::NoFieldsProvided);
        }

        self.repo.update(self.schema, &id, &changes).await?;
        let document = self.load(&id).await?;

        tracing::info!(
            collection = self.schema.collection,
            id = %id,
            fields = ?changes.keys().collect::<Vec<_>>(),
            "Updated {}",
            self.schema.entity_name
        );
        Ok(document)
    }

    /// Delete a document, returning it as it was just before removal
    pub async fn delete(&self, raw_id: &str) -> Result<Document> {
        let id = self.parse_id(raw_id)?;
        let document = self.load(&id).await?;

        if !self.repo.delete(self.schema, &id).await? {
            // Removed concurrently between lookup and delete
            return Err(CollectionServiceError::NotFound {
                entity: self.schema.entity_name,
                id: id.to_string(),
            });
        }

        tracing::info!(
            collection = self.schema.collection,
            id = %id,
            "Deleted {}",
            self.schema.entity_name
        );
        Ok(document)
    }

    /// Every document, one page at a time
    pub async fn list(
        &self,
        sort: Option<SortSpec>,
        page: PageRequest,
    ) -> Result<PageResult<Document>> {
        self.query(&Filter::all(), sort, page).await
    }

    /// Documents matching the collection's filter parameters
    pub async fn search(
        &self,
        params: &HashMap<String, String>,
        sort: Option<SortSpec>,
        page: PageRequest,
    ) -> Result<PageResult<Document>> {
        let filter = build_filter(self.schema, params)?;
        tracing::debug!(
            collection = self.schema.collection,
            predicates = filter.predicates().len(),
            "Searching"
        );
        self.query(&filter, sort, page).await
    }

    /// Count the filtered set, then fetch the requested page of it
    pub async fn query(
        &self,
        filter: &Filter,
        sort: Option<SortSpec>,
        page: PageRequest,
    ) -> Result<PageResult<Document>> {
        if !page.is_valid(self.max_page_size) {
            return Err(ValidationErrors::single(
                "page_size",
                format!(
                    "page must be at least 1 and page_size between 1 and {}",
                    self.max_page_size
                ),
            )
            .into());
        }
        if let Some(sort) = sort {
            if self.schema.sortable_field(sort.field).is_none() {
                return Err(ValidationErrors::single(
                    "sort_by",
                    format!("{} is not sortable", sort.field),
                )
                .into());
            }
        }

        let total = self.repo.count(self.schema, filter).await?;
        let items = self.repo.find_page(self.schema, filter, sort, page).await?;
        Ok(PageResult::new(items, total, page))
    }
}

/// The collection services mounted by the application, by collection name
#[derive(Default)]
pub struct CollectionRegistry {
    services: BTreeMap<&'static str, Arc<CollectionService>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a service for each schema over a shared repository
    pub fn from_schemas(
        schemas: &[&'static EntitySchema],
        repo: Arc<dyn DocumentRepository>,
        max_page_size: u32,
    ) -> Self {
        let mut registry = Self::new();
        for schema in schemas.iter().copied() {
            registry.register(Arc::new(CollectionService::new(
                schema,
                repo.clone(),
                max_page_size,
            )));
        }
        registry
    }

    pub fn register(&mut self, service: Arc<CollectionService>) {
        self.services.insert(service.schema().collection, service);
    }

    pub fn get(&self, collection: &str) -> Option<Arc<CollectionService>> {
        self.services.get(collection).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.services.keys().copied().collect()
    }
}
