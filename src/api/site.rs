//! Service banner and health check
//!
//! Both endpoints are public and independent of any collection.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;

/// Response for the root banner
#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub message: String,
    pub version: String,
    pub environment: String,
}

/// Response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app_name: String,
    pub version: String,
    pub environment: String,
    pub database: &'static str,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

/// Build the site router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}

/// GET / - Service banner
async fn banner(State(state): State<AppState>) -> Json<BannerResponse> {
    Json(BannerResponse {
        message: format!("Welcome to {}", state.app.name),
        version: state.app.version.clone(),
        environment: state.app.environment.as_str().to_string(),
    })
}

/// GET /health - Liveness plus store connectivity
///
/// Returns 503 when the store cannot be pinged.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = match state.pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check failed: {:#}", e);
            false
        }
    };

    let (status_code, status, database) = if connected {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            app_name: state.app.name.clone(),
            version: state.app.version.clone(),
            environment: state.app.environment.as_str().to_string(),
            database,
            uptime_seconds: state.request_stats.uptime_seconds(),
            total_requests: state.request_stats.total_requests(),
            avg_response_time_ms: state.request_stats.avg_response_time_us() / 1000.0,
        }),
    )
}
