//! Stockroom - A schema-driven catalog service

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockroom::{
    api::{self, AppState},
    config::Config,
    db::{self, repositories::SqlxDocumentRepository},
    services::CollectionRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = Config::default_path();
    let config = Config::load_with_env(&config_path)?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.directive().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(config.logging.ansi))
        .init();

    tracing::info!(
        "Starting {} {} ({})",
        config.app.name,
        config.app.version,
        config.app.environment.as_str()
    );

    config.validate()?;
    tracing::info!("Configuration loaded from {}", config_path.display());

    // Connect to the database, retrying while it comes up
    let pool = db::connect_with_retry(&config.database).await?;

    // Create missing collections
    let schemas = config.enabled_schemas();
    db::migrations::run_migrations(&pool, &schemas).await?;
    tracing::info!(
        "Serving collections: {}",
        schemas
            .iter()
            .map(|schema| schema.collection)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let registry = CollectionRegistry::from_schemas(
        &schemas,
        SqlxDocumentRepository::boxed(pool.clone()),
        config.pagination.max_page_size,
    );
    let state = AppState::new(pool.clone(), registry, &config);

    // Build router
    let app = api::build_router(state, &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    // Stop on Ctrl-C without draining in-flight requests
    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    pool.close().await;
    tracing::info!("Database connection closed");

    Ok(())
}
