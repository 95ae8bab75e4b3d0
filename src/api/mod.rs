//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the Stockroom service.
//! It includes:
//! - Service banner and health check
//! - Create, read, update, delete, list and search for every enabled collection
//! - Request logging and security header middleware

pub mod collections;
pub mod common;
pub mod middleware;
pub mod responses;
pub mod site;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;

pub use middleware::{ApiError, AppState, RequestStats};

/// CORS layer for the configured origins; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the API routes without middleware
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(site::router())
        .merge(collections::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let mut router = build_api_router().layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&server.cors_origins)),
    );

    if server.security_headers {
        router = router.layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ));
    }

    router
        // Request logging (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_logging_middleware,
        ))
        .with_state(state)
}
