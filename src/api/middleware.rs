//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type returned by every handler
//! - Request logging (request id, timing, statistics)
//! - Security response headers

use axum::{
    extract::{Request, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AppConfig, Config, PaginationConfig};
use crate::services::{CollectionRegistry, CollectionServiceError, FieldError, ValidationErrors};

/// Header carrying the per-request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the handling time in seconds
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    /// Total number of requests processed
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    /// Application start time
    start_time: Instant,
}

impl RequestStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Get total request count
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Get average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub collections: Arc<CollectionRegistry>,
    pub app: Arc<AppConfig>,
    pub pagination: PaginationConfig,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    pub fn new(
        pool: crate::db::DynDatabasePool,
        collections: CollectionRegistry,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            collections: Arc::new(collections),
            app: Arc::new(config.app.clone()),
            pagination: config.pagination,
            request_stats: Arc::new(RequestStats::new()),
        }
    }

    /// Translate a service failure into a response, hiding unexpected
    /// error details unless running in debug mode
    pub fn reject(&self, error: CollectionServiceError) -> ApiError {
        ApiError::from_service(error, self.app.debug)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub detail: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: code.into(),
            errors: None,
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", detail)
    }

    pub fn validation_error(errors: &ValidationErrors) -> Self {
        Self {
            detail: "Validation error occurred".to_string(),
            code: "VALIDATION_ERROR".to_string(),
            errors: Some(errors.errors().to_vec()),
        }
    }

    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new("STORE_UNAVAILABLE", detail)
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", detail)
    }

    /// Map a service failure to its error body.
    ///
    /// Store failures are logged here. Unexpected failures carry their error
    /// chain in `detail` only when `debug` is set.
    pub fn from_service(error: CollectionServiceError, debug: bool) -> Self {
        let detail = error.to_string();
        match error {
            CollectionServiceError::Validation(errors) => Self::validation_error(&errors),
            CollectionServiceError::InvalidIdentifier { .. } => Self::new("INVALID_ID", detail),
            CollectionServiceError::NotFound { .. } => Self::not_found(detail),
            CollectionServiceError::NoFieldsProvided => Self::new("NO_FIELDS", detail),
            CollectionServiceError::InvalidRange { .. } => Self::new("INVALID_RANGE", detail),
            CollectionServiceError::StoreUnavailable(e) => {
                tracing::error!("Store unavailable: {:#}", e);
                Self::service_unavailable("Database service unavailable")
            }
            CollectionServiceError::Unexpected(e) => {
                tracing::error!("Unexpected error: {:#}", e);
                if debug {
                    Self::internal_error(format!("{:#}", e))
                } else {
                    Self::internal_error("An unexpected error occurred")
                }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_ID" | "NO_FIELDS" | "INVALID_RANGE" => StatusCode::BAD_REQUEST,
            "STORE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Assign a request id, time the request, log it and record statistics.
///
/// Adds `X-Request-ID` and `X-Process-Time` to every response.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(%request_id, %method, %path, "Request started");

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    state.request_stats.record(elapsed.as_micros() as u64);

    let status = response.status().as_u16();
    let elapsed_ms = elapsed.as_millis() as u64;
    if response.status().is_server_error() {
        tracing::error!(%request_id, %method, %path, status, elapsed_ms, "Request failed");
    } else {
        tracing::info!(%request_id, %method, %path, status, elapsed_ms, "Request completed");
    }

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.3}", elapsed.as_secs_f64())) {
        headers.insert(HeaderName::from_static(PROCESS_TIME_HEADER), value);
    }

    response
}

const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
];

/// Add hardening headers to every response
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    response
}
