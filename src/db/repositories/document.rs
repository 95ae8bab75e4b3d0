//! Document repository
//!
//! Database operations for collection documents.
//!
//! This module provides:
//! - `DocumentRepository` trait defining the interface for document data access
//! - `SqlxDocumentRepository` implementing the trait for SQLite and MySQL
//!
//! Every operation targets a single row, so each write is atomic on its own.
//! Concurrent updates to the same document are last-write-wins.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql_pool, sqlite_pool};
use crate::db::query::{self, CompiledQuery};
use crate::db::DynDatabasePool;
use crate::models::{
    Document, DocumentId, EntitySchema, FieldKind, FieldValues, Filter, PageRequest, SortSpec,
    Value,
};

/// Document repository trait
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Store a new document
    async fn insert(&self, schema: &EntitySchema, document: &Document) -> Result<()>;

    /// Get document by ID
    async fn find_by_id(&self, schema: &EntitySchema, id: &DocumentId)
        -> Result<Option<Document>>;

    /// Overwrite the given fields of a document
    async fn update(
        &self,
        schema: &EntitySchema,
        id: &DocumentId,
        changes: &FieldValues,
    ) -> Result<()>;

    /// Delete a document, returning whether it existed
    async fn delete(&self, schema: &EntitySchema, id: &DocumentId) -> Result<bool>;

    /// Count documents matching a filter
    async fn count(&self, schema: &EntitySchema, filter: &Filter) -> Result<u64>;

    /// Fetch one page of documents matching a filter
    async fn find_page(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
        sort: Option<SortSpec>,
        page: PageRequest,
    ) -> Result<Vec<Document>>;
}

/// SQLx-based document repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxDocumentRepository {
    pool: DynDatabasePool,
}

impl SqlxDocumentRepository {
    /// Create a new SQLx document repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn DocumentRepository> {
        Arc::new(Self::new(pool))
    }

    async fn execute(&self, query: &CompiledQuery) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => execute_sqlite(sqlite_pool(self.pool.as_ref())?, query).await,
            DatabaseDriver::Mysql => execute_mysql(mysql_pool(self.pool.as_ref())?, query).await,
        }
    }

    async fn fetch(&self, schema: &EntitySchema, query: &CompiledQuery) -> Result<Vec<Document>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_sqlite(sqlite_pool(self.pool.as_ref())?, schema, query).await
            }
            DatabaseDriver::Mysql => {
                fetch_mysql(mysql_pool(self.pool.as_ref())?, schema, query).await
            }
        }
    }
}

#[async_trait]
impl DocumentRepository for SqlxDocumentRepository {
    async fn insert(&self, schema: &EntitySchema, document: &Document) -> Result<()> {
        let query = query::insert(schema, &document.id, &document.fields);
        self.execute(&query)
            .await
            .with_context(|| format!("Failed to insert into {}", schema.collection))?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        schema: &EntitySchema,
        id: &DocumentId,
    ) -> Result<Option<Document>> {
        let query = query::select_by_id(schema, id);
        let mut documents = self
            .fetch(schema, &query)
            .await
            .with_context(|| format!("Failed to load {} document {}", schema.collection, id))?;
        Ok(documents.pop())
    }

    async fn update(
        &self,
        schema: &EntitySchema,
        id: &DocumentId,
        changes: &FieldValues,
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let query = query::update(schema, id, changes);
        self.execute(&query)
            .await
            .with_context(|| format!("Failed to update {} document {}", schema.collection, id))?;
        Ok(())
    }

    async fn delete(&self, schema: &EntitySchema, id: &DocumentId) -> Result<bool> {
        let query = query::delete(schema, id);
        let affected = self
            .execute(&query)
            .await
            .with_context(|| format!("Failed to delete {} document {}", schema.collection, id))?;
        Ok(affected > 0)
    }

    async fn count(&self, schema: &EntitySchema, filter: &Filter) -> Result<u64> {
        let query = query::count(schema, filter);
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => count_sqlite(sqlite_pool(self.pool.as_ref())?, &query).await,
            DatabaseDriver::Mysql => count_mysql(mysql_pool(self.pool.as_ref())?, &query).await,
        };
        count.with_context(|| format!("Failed to count {}", schema.collection))
    }

    async fn find_page(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
        sort: Option<SortSpec>,
        page: PageRequest,
    ) -> Result<Vec<Document>> {
        let query = query::select_page(schema, filter, sort, page);
        self.fetch(schema, &query)
            .await
            .with_context(|| format!("Failed to list {}", schema.collection))
    }
}

// ============================================================================
// SQLite implementation
// ============================================================================

fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Integer(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Bool(b) => query.bind(*b),
        Value::Timestamp(t) => query.bind(*t),
    }
}

fn prepare_sqlite(query: &CompiledQuery) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    query
        .params
        .iter()
        .fold(sqlx::query(&query.sql), bind_sqlite)
}

async fn execute_sqlite(pool: &SqlitePool, query: &CompiledQuery) -> Result<u64> {
    let result = prepare_sqlite(query).execute(pool).await?;
    Ok(result.rows_affected())
}

async fn count_sqlite(pool: &SqlitePool, query: &CompiledQuery) -> Result<u64> {
    let row = prepare_sqlite(query).fetch_one(pool).await?;
    let count: i64 = row.try_get("count")?;
    Ok(count.max(0) as u64)
}

async fn fetch_sqlite(
    pool: &SqlitePool,
    schema: &EntitySchema,
    query: &CompiledQuery,
) -> Result<Vec<Document>> {
    let rows = prepare_sqlite(query).fetch_all(pool).await?;
    rows.iter()
        .map(|row| row_to_document_sqlite(row, schema))
        .collect()
}

fn row_to_document_sqlite(row: &SqliteRow, schema: &EntitySchema) -> Result<Document> {
    let id: String = row.try_get("id")?;
    let id = id
        .parse::<DocumentId>()
        .with_context(|| format!("Corrupt document id in {}", schema.collection))?;

    let mut fields = FieldValues::new();
    for field in schema.fields {
        let name = field.name;
        let value = match field.kind {
            FieldKind::Text => row.try_get::<Option<String>, _>(name)?.map(Value::Text),
            FieldKind::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::Integer),
            FieldKind::Float => row.try_get::<Option<f64>, _>(name)?.map(Value::Float),
            FieldKind::Bool => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
            FieldKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(Value::Timestamp),
        };
        fields.insert(name.to_string(), value.unwrap_or(Value::Null));
    }

    Ok(Document::new(id, fields))
}

// ============================================================================
// MySQL implementation
// ============================================================================

fn bind_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Integer(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Bool(b) => query.bind(*b),
        Value::Timestamp(t) => query.bind(*t),
    }
}

fn prepare_mysql(query: &CompiledQuery) -> Query<'_, MySql, MySqlArguments> {
    query
        .params
        .iter()
        .fold(sqlx::query(&query.sql), bind_mysql)
}

async fn execute_mysql(pool: &MySqlPool, query: &CompiledQuery) -> Result<u64> {
    let result = prepare_mysql(query).execute(pool).await?;
    Ok(result.rows_affected())
}

async fn count_mysql(pool: &MySqlPool, query: &CompiledQuery) -> Result<u64> {
    let row = prepare_mysql(query).fetch_one(pool).await?;
    let count: i64 = row.try_get("count")?;
    Ok(count.max(0) as u64)
}

async fn fetch_mysql(
    pool: &MySqlPool,
    schema: &EntitySchema,
    query: &CompiledQuery,
) -> Result<Vec<Document>> {
    let rows = prepare_mysql(query).fetch_all(pool).await?;
    rows.iter()
        .map(|row| row_to_document_mysql(row, schema))
        .collect()
}

fn row_to_document_mysql(row: &MySqlRow, schema: &EntitySchema) -> Result<Document> {
    let id: String = row.try_get("id")?;
    let id = id
        .parse::<DocumentId>()
        .with_context(|| format!("Corrupt document id in {}", schema.collection))?;

    let mut fields = FieldValues::new();
    for field in schema.fields {
        let name = field.name;
        let value = match field.kind {
            FieldKind::Text => row.try_get::<Option<String>, _>(name)?.map(Value::Text),
            FieldKind::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::Integer),
            FieldKind::Float => row.try_get::<Option<f64>, _>(name)?.map(Value::Float),
            FieldKind::Bool => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
            FieldKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(Value::Timestamp),
        };
        fields.insert(name.to_string(), value.unwrap_or(Value::Null));
    }

    Ok(Document::new(id, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{self, BOOKS, PRODUCTS};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Predicate, SortDirection};
    use chrono::TimeZone;

    async fn setup_test_repo() -> SqlxDocumentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool, collections::all())
            .await
            .expect("Failed to run migrations");
        SqlxDocumentRepository::new(pool)
    }

    fn product(name: &str, category: &str, price: f64, quantity: i64) -> Document {
        let mut fields = FieldValues::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("category".to_string(), Value::from(category));
        fields.insert("price".to_string(), Value::Float(price));
        fields.insert("quantity".to_string(), Value::Integer(quantity));
        Document::new(DocumentId::generate(), fields)
    }

    fn contains(field: &'static str, needle: &str) -> Predicate {
        Predicate::TextContains {
            field,
            needle: needle.to_string(),
        }
    }

    async fn seed_products(repo: &SqlxDocumentRepository) -> Vec<Document> {
        let documents = vec![
            product("Oak Desk", "Furniture", 250.0, 2),
            product("Desk Lamp", "Lighting", 35.5, 0),
            product("Office Chair", "Furniture", 120.0, 7),
            product("100% Cotton Rug", "Textiles", 80.25, 1),
        ];
        for document in &documents {
            repo.insert(&PRODUCTS, document).await.expect("Failed to insert");
        }
        documents
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let repo = setup_test_repo().await;
        let created_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let mut fields = FieldValues::new();
        fields.insert("title".to_string(), Value::from("Dune"));
        fields.insert("author".to_string(), Value::from("Frank Herbert"));
        fields.insert("description".to_string(), Value::Null);
        fields.insert("published_year".to_string(), Value::Integer(1965));
        fields.insert("price".to_string(), Value::Float(9.99));
        fields.insert("genre".to_string(), Value::Null);
        fields.insert("created_at".to_string(), Value::Timestamp(created_at));
        let document = Document::new(DocumentId::generate(), fields);

        repo.insert(&BOOKS, &document).await.expect("Failed to insert");

        let found = repo
            .find_by_id(&BOOKS, &document.id)
            .await
            .expect("Failed to load")
            .expect("Document should exist");
        assert_eq!(found, document);
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = setup_test_repo().await;
        let found = repo
            .find_by_id(&BOOKS, &DocumentId::generate())
            .await
            .expect("Failed to load");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_update_overwrites_only_given_fields() {
        let repo = setup_test_repo().await;
        let documents = seed_products(&repo).await;
        let target = &documents[1];

        let mut changes = FieldValues::new();
        changes.insert("quantity".to_string(), Value::Integer(12));
        repo.update(&PRODUCTS, &target.id, &changes).await.expect("Failed to update");

        let reloaded = repo.find_by_id(&PRODUCTS, &target.id).await.unwrap().unwrap();
        assert_eq!(reloaded.get("quantity"), &Value::Integer(12));
        assert_eq!(reloaded.get("name"), target.get("name"));
        assert_eq!(reloaded.get("price"), target.get("price"));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test_repo().await;
        let documents = seed_products(&repo).await;

        assert!(repo.delete(&PRODUCTS, &documents[0].id).await.unwrap());
        assert!(!repo.delete(&PRODUCTS, &documents[0].id).await.unwrap());
        assert!(repo.find_by_id(&PRODUCTS, &documents[0].id).await.unwrap().is_none());
        assert_eq!(repo.count(&PRODUCTS, &Filter::all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_text_filter_is_case_insensitive_and_literal() {
        let repo = setup_test_repo().await;
        seed_products(&repo).await;

        let mut filter = Filter::all();
        filter.push(contains("name", "DESK"));
        assert_eq!(repo.count(&PRODUCTS, &filter).await.unwrap(), 2);

        let mut filter = Filter::all();
        filter.push(contains("name", "100%"));
        assert_eq!(repo.count(&PRODUCTS, &filter).await.unwrap(), 1);

        let mut filter = Filter::all();
        filter.push(contains("name", "%"));
        filter.push(contains("category", "furn"));
        assert_eq!(repo.count(&PRODUCTS, &filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_text_filter_folds_non_ascii_case() {
        let repo = setup_test_repo().await;
        let mut fields = FieldValues::new();
        fields.insert("title".to_string(), Value::from("Émile ou de l'éducation"));
        fields.insert("author".to_string(), Value::from("Ünal Öztürk"));
        fields.insert("published_year".to_string(), Value::Integer(1762));
        fields.insert("price".to_string(), Value::Float(12.5));
        fields.insert("created_at".to_string(), Value::Timestamp(Utc::now()));
        repo.insert(&BOOKS, &Document::new(DocumentId::generate(), fields))
            .await
            .expect("Failed to insert");

        for (field, needle) in [
            ("title", "émile"),
            ("title", "ÉMILE"),
            ("title", "Émile"),
            ("title", "L'ÉDUCATION"),
            ("author", "ünal"),
            ("author", "ÖZTÜRK"),
        ] {
            let mut filter = Filter::all();
            filter.push(contains(field, needle));
            assert_eq!(
                repo.count(&BOOKS, &filter).await.unwrap(),
                1,
                "{} contains {}",
                field,
                needle
            );
        }
    }

    #[tokio::test]
    async fn test_update_refreshes_text_search() {
        let repo = setup_test_repo().await;
        let documents = seed_products(&repo).await;

        let mut changes = FieldValues::new();
        changes.insert("name".to_string(), Value::from("Ölkanne"));
        repo.update(&PRODUCTS, &documents[2].id, &changes)
            .await
            .expect("Failed to update");

        let mut filter = Filter::all();
        filter.push(contains("name", "ÖLKANNE"));
        assert_eq!(repo.count(&PRODUCTS, &filter).await.unwrap(), 1);

        let mut filter = Filter::all();
        filter.push(contains("name", "chair"));
        assert_eq!(repo.count(&PRODUCTS, &filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_range_and_sort() {
        let repo = setup_test_repo().await;
        seed_products(&repo).await;

        let mut filter = Filter::all();
        filter.push(Predicate::NumericRange {
            field: "price",
            min: Some(Value::Float(35.5)),
            max: Some(Value::Float(120.0)),
        });
        let sort = SortSpec {
            field: "price",
            direction: SortDirection::Desc,
        };

        let page = repo
            .find_page(&PRODUCTS, &filter, Some(sort), PageRequest::new(1, 10))
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|d| d.get("name").as_text().unwrap()).collect();
        assert_eq!(names, vec!["Office Chair", "100% Cotton Rug", "Desk Lamp"]);
    }

    #[tokio::test]
    async fn test_pages_partition_sorted_results() {
        let repo = setup_test_repo().await;
        seed_products(&repo).await;
        let sort = SortSpec {
            field: "name",
            direction: SortDirection::Asc,
        };

        let mut seen = Vec::new();
        for page in 1..=3 {
            let items = repo
                .find_page(&PRODUCTS, &Filter::all(), Some(sort), PageRequest::new(page, 2))
                .await
                .unwrap();
            seen.extend(items.into_iter().map(|d| d.get("name").as_text().unwrap().to_string()));
        }

        assert_eq!(
            seen,
            vec!["100% Cotton Rug", "Desk Lamp", "Oak Desk", "Office Chair"]
        );
    }
}
