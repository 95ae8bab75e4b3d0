//! Shared API response types
//!
//! Documents leave the service as JSON objects: the identifier as a
//! lowercase hex string under `_id`, every schema field present (explicit
//! `null` when unset) and computed fields evaluated at mapping time.

use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::models::{Document, EntitySchema, PageResult};

// ============================================================================
// Document Response Types
// ============================================================================

/// Key holding the document identifier in responses
pub const ID_KEY: &str = "_id";

/// Map a stored document to its wire form
pub fn document_response(schema: &EntitySchema, document: &Document) -> Json {
    let mut body = Map::new();
    body.insert(ID_KEY.to_string(), Json::String(document.id.to_hex()));

    for field in schema.fields {
        body.insert(field.name.to_string(), document.get(field.name).to_json());
    }
    for computed in schema.computed {
        body.insert(
            computed.name.to_string(),
            (computed.compute)(document).to_json(),
        );
    }

    Json::Object(body)
}

// ============================================================================
// List Response Types
// ============================================================================

/// Paginated list body; the items sit under the collection's name
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    #[serde(flatten)]
    pub items: Map<String, Json>,
}

impl ListResponse {
    pub fn new(schema: &EntitySchema, result: &PageResult<Document>) -> Self {
        let documents = result
            .items
            .iter()
            .map(|document| document_response(schema, document))
            .collect();

        let mut items = Map::new();
        items.insert(schema.collection.to_string(), Json::Array(documents));

        Self {
            total: result.total,
            page: result.page,
            page_size: result.page_size,
            total_pages: result.total_pages(),
            items,
        }
    }
}

// ============================================================================
// Common Response Types
// ============================================================================

/// Generic message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Confirmation returned after a delete
    pub fn deleted(schema: &EntitySchema, document: &Document) -> Self {
        Self::new(format!(
            "{} '{}' deleted successfully",
            schema.entity_name,
            document.display_name(schema)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{BOOKS, PRODUCTS};
    use crate::models::{DocumentId, FieldValues, PageRequest, Value};
    use serde_json::json;

    fn product(quantity: i64) -> Document {
        let mut fields = FieldValues::new();
        fields.insert("name".to_string(), Value::from("Desk"));
        fields.insert("category".to_string(), Value::from("Office"));
        fields.insert("price".to_string(), Value::Float(120.5));
        fields.insert("quantity".to_string(), Value::Integer(quantity));
        Document::new(DocumentId::from_bytes([0xab; 12]), fields)
    }

    #[test]
    fn test_document_response_has_hex_id_and_computed_field() {
        let body = document_response(&PRODUCTS, &product(0));

        assert_eq!(
            body,
            json!({
                "_id": "abababababababababababab",
                "name": "Desk",
                "category": "Office",
                "price": 120.5,
                "quantity": 0,
                "in_stock": false
            })
        );
    }

    #[test]
    fn test_absent_optional_field_is_explicit_null() {
        let mut fields = FieldValues::new();
        fields.insert("title".to_string(), Value::from("Dune"));
        let document = Document::new(DocumentId::generate(), fields);

        let body = document_response(&BOOKS, &document);

        assert!(body.as_object().unwrap().contains_key("description"));
        assert_eq!(body["description"], Json::Null);
    }

    #[test]
    fn test_list_response_uses_collection_key() {
        let result = PageResult::new(vec![product(2)], 1, PageRequest::new(1, 10));
        let body = serde_json::to_value(ListResponse::new(&PRODUCTS, &result)).unwrap();

        assert_eq!(body["total"], 1);
        assert_eq!(body["total_pages"], 1);
        assert_eq!(body["products"][0]["in_stock"], true);
    }

    #[test]
    fn test_deleted_message() {
        let message = MessageResponse::deleted(&PRODUCTS, &product(1));
        assert_eq!(message.message, "Product 'Desk' deleted successfully");
    }
}
