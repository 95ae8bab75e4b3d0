//! Database layer
//!
//! This module provides storage for the Stockroom service.
//! It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The database layer uses a trait-based abstraction (`DatabasePool`) that
//! allows the application to work with either SQLite or MySQL without
//! knowing the specific backend. Each collection maps to one table generated
//! from its schema; `query` compiles filters, sorting and paging into SQL
//! that both drivers accept.
//!
//! # Usage
//!
//! ```ignore
//! use stockroom::collections;
//! use stockroom::config::DatabaseConfig;
//! use stockroom::db::{connect_with_retry, migrations};
//!
//! let pool = connect_with_retry(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool, collections::all()).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;

pub use pool::{
    connect_with_retry, create_pool, create_test_pool, is_unavailable, DatabasePool,
    DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
