//! Collection API endpoints
//!
//! One set of handlers serves every registered collection; the collection
//! name in the path selects the service.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::common::{filter_params, parse_list_query};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{document_response, ListResponse, MessageResponse};
use crate::services::{CollectionService, ValidationErrors};

/// Build the collection router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{collection}", get(list_documents).post(create_document))
        .route("/{collection}/", get(list_documents).post(create_document))
        .route("/{collection}/search", get(search_documents))
        .route("/{collection}/search/", get(search_documents))
        .route(
            "/{collection}/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
}

fn service_for(state: &AppState, collection: &str) -> Result<Arc<CollectionService>, ApiError> {
    state
        .collections
        .get(collection)
        .ok_or_else(|| ApiError::not_found(format!("Collection '{}' not found", collection)))
}

/// Unwrap a JSON object body; anything else is a validation failure
fn body_object(
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Map<String, JsonValue>, ApiError> {
    match body {
        Ok(Json(JsonValue::Object(map))) => Ok(map),
        Ok(Json(_)) => Err(ApiError::validation_error(&ValidationErrors::single(
            "body",
            "Input should be a valid object",
        ))),
        Err(rejection) => Err(ApiError::validation_error(&ValidationErrors::single(
            "body",
            rejection.body_text(),
        ))),
    }
}

/// POST /{collection} - Create a document
async fn create_document(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let service = service_for(&state, &collection)?;
    let input = body_object(body)?;

    let document = service.create(&input).await.map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::CREATED,
        Json(document_response(service.schema(), &document)),
    ))
}

/// GET /{collection} - Paginated list
async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse>, ApiError> {
    let service = service_for(&state, &collection)?;
    let query = parse_list_query(service.schema(), &params, state.pagination)
        .map_err(|errors| ApiError::validation_error(&errors))?;

    let result = service
        .list(query.sort, query.page)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(ListResponse::new(service.schema(), &result)))
}

/// GET /{collection}/search - Filtered, paginated list
async fn search_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse>, ApiError> {
    let service = service_for(&state, &collection)?;
    let query = parse_list_query(service.schema(), &params, state.pagination)
        .map_err(|errors| ApiError::validation_error(&errors))?;

    let result = service
        .search(&filter_params(&params), query.sort, query.page)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(ListResponse::new(service.schema(), &result)))
}

/// GET /{collection}/{id} - Fetch one document
async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<JsonValue>, ApiError> {
    let service = service_for(&state, &collection)?;
    let document = service.get(&id).await.map_err(|e| state.reject(e))?;
    Ok(Json(document_response(service.schema(), &document)))
}

/// PUT /{collection}/{id} - Partial update
async fn update_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let service = service_for(&state, &collection)?;
    let input = body_object(body)?;

    let document = service.update(&id, &input).await.map_err(|e| state.reject(e))?;

    Ok(Json(document_response(service.schema(), &document)))
}

/// DELETE /{collection}/{id} - Delete one document
async fn delete_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let service = service_for(&state, &collection)?;
    let document = service.delete(&id).await.map_err(|e| state.reject(e))?;
    Ok(Json(MessageResponse::deleted(service.schema(), &document)))
}
