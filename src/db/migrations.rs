//! Collection bootstrap
//!
//! Each collection is stored in its own table whose columns are derived from
//! the collection's [`EntitySchema`], plus a case-folded copy of every text
//! field a contains filter searches. Created collections are recorded in the
//! `_collections` table so startup only creates what is missing.

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql_pool, sqlite_pool};
use crate::db::query::search_column;
use crate::db::DynDatabasePool;
use crate::models::{EntitySchema, FieldKind, FieldSpec};

/// Longest text column stored as VARCHAR on MySQL
const MYSQL_VARCHAR_LIMIT: usize = 255;

/// Index prefix length for MySQL TEXT columns
const MYSQL_TEXT_INDEX_PREFIX: usize = 191;

fn sqlite_column_type(field: &FieldSpec) -> &'static str {
    match field.kind {
        FieldKind::Text => "TEXT",
        FieldKind::Integer => "INTEGER",
        FieldKind::Float => "REAL",
        FieldKind::Bool => "BOOLEAN",
        FieldKind::Timestamp => "TIMESTAMP",
    }
}

fn mysql_column_type(field: &FieldSpec) -> String {
    match field.kind {
        FieldKind::Text => match field.max_length() {
            Some(max) if max <= MYSQL_VARCHAR_LIMIT => format!("VARCHAR({})", max),
            _ => "TEXT".to_string(),
        },
        FieldKind::Integer => "BIGINT".to_string(),
        FieldKind::Float => "DOUBLE".to_string(),
        FieldKind::Bool => "BOOLEAN".to_string(),
        FieldKind::Timestamp => "DATETIME(6)".to_string(),
    }
}

fn nullability(field: &FieldSpec) -> &'static str {
    if field.is_nullable() {
        "NULL"
    } else {
        "NOT NULL"
    }
}

/// Statements that create the table and indexes for `schema`
pub fn create_table_statements(driver: DatabaseDriver, schema: &EntitySchema) -> Vec<String> {
    let table = schema.collection;

    match driver {
        DatabaseDriver::Sqlite => {
            let mut columns = vec!["    id VARCHAR(24) PRIMARY KEY".to_string()];
            columns.extend(schema.fields.iter().map(|field| {
                format!(
                    "    {} {} {}",
                    field.name,
                    sqlite_column_type(field),
                    nullability(field)
                )
            }));
            columns.extend(
                schema
                    .searchable_fields()
                    .map(|field| format!("    {} TEXT NULL", search_column(field))),
            );

            let mut statements = vec![format!(
                "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
                table,
                columns.join(",\n")
            )];
            statements.extend(schema.indexes.iter().map(|column| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} ({column})"
                )
            }));
            statements
        }
        DatabaseDriver::Mysql => {
            let mut columns = vec!["    id VARCHAR(24) PRIMARY KEY".to_string()];
            columns.extend(schema.fields.iter().map(|field| {
                format!(
                    "    {} {} {}",
                    field.name,
                    mysql_column_type(field),
                    nullability(field)
                )
            }));
            columns.extend(
                schema
                    .searchable_fields()
                    .map(|field| format!("    {} TEXT NULL", search_column(field))),
            );
            columns.extend(schema.indexes.iter().filter_map(|column| {
                let field = schema.field(column)?;
                let key = if mysql_column_type(field) == "TEXT" {
                    format!("{}({})", column, MYSQL_TEXT_INDEX_PREFIX)
                } else {
                    column.to_string()
                };
                Some(format!("    INDEX idx_{}_{} ({})", table, column, key))
            }));

            vec![format!(
                "CREATE TABLE IF NOT EXISTS {} (\n{}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
                table,
                columns.join(",\n")
            )]
        }
    }
}

/// Create every collection in `schemas` that has not been created yet.
///
/// Returns the number of collections created.
pub async fn run_migrations(pool: &DynDatabasePool, schemas: &[&EntitySchema]) -> Result<usize> {
    create_tracking_table(pool).await?;
    let applied = applied_collections(pool).await?;

    let mut count = 0;

    for schema in schemas {
        if applied.iter().any(|name| name == schema.collection) {
            continue;
        }

        tracing::info!("Creating collection {}", schema.collection);
        for statement in create_table_statements(pool.driver(), schema) {
            pool.execute(&statement)
                .await
                .with_context(|| format!("Failed to create collection: {}", schema.collection))?;
        }
        pool.execute(&format!(
            "INSERT INTO _collections (name) VALUES ('{}')",
            schema.collection
        ))
        .await
        .with_context(|| format!("Failed to record collection: {}", schema.collection))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Created {} collection(s)", count);
    } else {
        tracing::debug!("All collections already exist");
    }

    Ok(count)
}

async fn create_tracking_table(pool: &DynDatabasePool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _collections (
            name VARCHAR(64) PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;
    Ok(())
}

async fn applied_collections(pool: &DynDatabasePool) -> Result<Vec<String>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => applied_collections_sqlite(sqlite_pool(pool.as_ref())?).await,
        DatabaseDriver::Mysql => applied_collections_mysql(mysql_pool(pool.as_ref())?).await,
    }
}

async fn applied_collections_sqlite(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM _collections ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to read created collections")?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
        .collect()
}

async fn applied_collections_mysql(pool: &MySqlPool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM _collections ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to read created collections")?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{self, BOOKS, PRODUCTS};
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool, collections::all())
            .await
            .expect("Failed to run migrations");
        assert_eq!(count, collections::all().len());

        // Running again should create nothing
        let count = run_migrations(&pool, collections::all())
            .await
            .expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_later_run_creates_only_new_collections() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        run_migrations(&pool, &[&BOOKS]).await.expect("Failed to run migrations");

        let count = run_migrations(&pool, collections::all())
            .await
            .expect("Failed to run migrations");
        assert_eq!(count, collections::all().len() - 1);
    }

    #[tokio::test]
    async fn test_created_table_accepts_rows() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool, &[&PRODUCTS]).await.expect("Failed to run migrations");

        let affected = pool
            .execute(
                "INSERT INTO products (id, name, category, price, quantity) \
                 VALUES ('aaaaaaaaaaaaaaaaaaaaaaaa', 'Desk', 'Office', 120.5, 3)",
            )
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);
    }

    #[test]
    fn test_sqlite_ddl() {
        let statements = create_table_statements(DatabaseDriver::Sqlite, &PRODUCTS);
        assert_eq!(
            statements[0],
            "CREATE TABLE IF NOT EXISTS products (\n    \
             id VARCHAR(24) PRIMARY KEY,\n    \
             name TEXT NOT NULL,\n    \
             category TEXT NOT NULL,\n    \
             price REAL NOT NULL,\n    \
             quantity INTEGER NOT NULL,\n    \
             name_folded TEXT NULL,\n    \
             category_folded TEXT NULL\n)"
        );
        assert_eq!(
            statements[1],
            "CREATE INDEX IF NOT EXISTS idx_products_name ON products (name)"
        );
        assert_eq!(statements.len(), 1 + PRODUCTS.indexes.len());
    }

    #[test]
    fn test_mysql_ddl_types_and_inline_indexes() {
        let statements = create_table_statements(DatabaseDriver::Mysql, &BOOKS);
        assert_eq!(statements.len(), 1);
        let ddl = &statements[0];
        assert!(ddl.contains("title VARCHAR(200) NOT NULL"));
        assert!(ddl.contains("description TEXT NULL"));
        assert!(ddl.contains("published_year BIGINT NOT NULL"));
        assert!(ddl.contains("price DOUBLE NOT NULL"));
        assert!(ddl.contains("created_at DATETIME(6) NOT NULL"));
        assert!(ddl.contains("INDEX idx_books_author (author)"));
        assert!(ddl.contains("title_folded TEXT NULL"));
        assert!(ddl.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
    }
}
