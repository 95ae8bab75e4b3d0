//! Configuration management
//!
//! This module handles loading and validating configuration for the Stockroom service.
//! Configuration can be loaded from:
//! - config.yml file (path overridable with `STOCKROOM_CONFIG`)
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::collections;
use crate::models::EntitySchema;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "STOCKROOM_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application identity
    #[serde(default)]
    pub app: AppConfig,
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Pagination limits
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Collections exposed over HTTP
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            pagination: PaginationConfig::default(),
            logging: LoggingConfig::default(),
            collections: default_collections(),
        }
    }
}

fn default_collections() -> Vec<String> {
    collections::all()
        .iter()
        .map(|schema| schema.collection.to_string())
        .collect()
}

/// Application identity reported by `/` and `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
    #[serde(default)]
    pub environment: Environment,
    /// Expose internal error messages to clients
    #[serde(default)]
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            environment: Environment::default(),
            debug: false,
        }
    }
}

fn default_app_name() -> String {
    "Stockroom".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "development" => Some(Environment::Development),
            "staging" => Some(Environment::Staging),
            "production" => Some(Environment::Production),
            _ => None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; `*` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Attach hardening headers to every response
    #[serde(default = "default_true")]
    pub security_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            security_headers: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_true() -> bool {
    true
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a request waits for a pooled connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Connection attempts made at startup before giving up
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    /// Fixed delay between startup connection attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            connect_retries: default_connect_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_database_url() -> String {
    "data/stockroom.db".to_string()
}

fn default_max_connections() -> u32 {
    50
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_connect_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Page size limits applied to list and search requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Colourised output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub fn directive(&self) -> String {
        let level = self.level.to_lowercase();
        format!("stockroom={level},tower_http={level}")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Config file path: `STOCKROOM_CONFIG` or `config.yml`
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.yml"))
    }

    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `STOCKROOM_<SECTION>_<KEY>`:
    /// - STOCKROOM_APP_NAME, STOCKROOM_APP_VERSION, STOCKROOM_APP_ENVIRONMENT, STOCKROOM_APP_DEBUG
    /// - STOCKROOM_SERVER_HOST, STOCKROOM_SERVER_PORT, STOCKROOM_SERVER_SECURITY_HEADERS
    /// - STOCKROOM_SERVER_CORS_ORIGINS (comma separated)
    /// - STOCKROOM_DATABASE_DRIVER, STOCKROOM_DATABASE_URL, STOCKROOM_DATABASE_MAX_CONNECTIONS
    /// - STOCKROOM_DATABASE_ACQUIRE_TIMEOUT_SECS, STOCKROOM_DATABASE_CONNECT_RETRIES,
    ///   STOCKROOM_DATABASE_RETRY_DELAY_SECS
    /// - STOCKROOM_PAGINATION_DEFAULT_PAGE_SIZE, STOCKROOM_PAGINATION_MAX_PAGE_SIZE
    /// - STOCKROOM_LOGGING_LEVEL, STOCKROOM_LOGGING_ANSI
    /// - STOCKROOM_COLLECTIONS (comma separated)
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(&mut self) {
        // App
        if let Ok(name) = std::env::var("STOCKROOM_APP_NAME") {
            self.app.name = name;
        }
        if let Ok(version) = std::env::var("STOCKROOM_APP_VERSION") {
            self.app.version = version;
        }
        if let Ok(env) = std::env::var("STOCKROOM_APP_ENVIRONMENT") {
            if let Some(env) = Environment::parse(&env) {
                self.app.environment = env;
            }
        }
        if let Some(debug) = env_parse::<bool>("STOCKROOM_APP_DEBUG") {
            self.app.debug = debug;
        }

        // Server
        if let Ok(host) = std::env::var("STOCKROOM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("STOCKROOM_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(origins) = std::env::var("STOCKROOM_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = split_list(&origins);
        }
        if let Some(enabled) = env_parse::<bool>("STOCKROOM_SERVER_SECURITY_HEADERS") {
            self.server.security_headers = enabled;
        }

        // Database
        if let Ok(driver) = std::env::var("STOCKROOM_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("STOCKROOM_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = env_parse::<u32>("STOCKROOM_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }
        if let Some(secs) = env_parse::<u64>("STOCKROOM_DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = secs;
        }
        if let Some(retries) = env_parse::<u32>("STOCKROOM_DATABASE_CONNECT_RETRIES") {
            self.database.connect_retries = retries;
        }
        if let Some(delay) = env_parse::<u64>("STOCKROOM_DATABASE_RETRY_DELAY_SECS") {
            self.database.retry_delay_secs = delay;
        }

        // Pagination
        if let Some(size) = env_parse::<u32>("STOCKROOM_PAGINATION_DEFAULT_PAGE_SIZE") {
            self.pagination.default_page_size = size;
        }
        if let Some(size) = env_parse::<u32>("STOCKROOM_PAGINATION_MAX_PAGE_SIZE") {
            self.pagination.max_page_size = size;
        }

        // Logging
        if let Ok(level) = std::env::var("STOCKROOM_LOGGING_LEVEL") {
            self.logging.level = level;
        }
        if let Some(ansi) = env_parse::<bool>("STOCKROOM_LOGGING_ANSI") {
            self.logging.ansi = ansi;
        }

        if let Ok(names) = std::env::var("STOCKROOM_COLLECTIONS") {
            self.collections = split_list(&names);
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.environment == Environment::Production
            && self.server.cors_origins.iter().any(|origin| origin == "*")
        {
            return Err(ConfigError::ValidationError(
                "wildcard CORS origin is not allowed in production".to_string(),
            ));
        }

        let pagination = &self.pagination;
        if pagination.max_page_size == 0 || pagination.default_page_size == 0 {
            return Err(ConfigError::ValidationError(
                "page sizes must be positive".to_string(),
            ));
        }
        if pagination.default_page_size > pagination.max_page_size {
            return Err(ConfigError::ValidationError(format!(
                "default_page_size ({}) exceeds max_page_size ({})",
                pagination.default_page_size, pagination.max_page_size
            )));
        }

        if self.database.connect_retries == 0 {
            return Err(ConfigError::ValidationError(
                "database.connect_retries must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown log level '{}', expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        for name in &self.collections {
            if collections::find(name).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "unknown collection '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Schemas of the enabled collections, in configured order.
    ///
    /// Unknown and repeated names are skipped.
    pub fn enabled_schemas(&self) -> Vec<&'static EntitySchema> {
        let mut schemas: Vec<&'static EntitySchema> = Vec::new();
        for schema in self.collections.iter().filter_map(|name| collections::find(name)) {
            if !schemas.iter().any(|s| s.collection == schema.collection) {
                schemas.push(schema);
            }
        }
        schemas
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
