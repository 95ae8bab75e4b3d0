//! Stored documents

use std::collections::BTreeMap;

use crate::models::{DocumentId, EntitySchema, Value};

/// Normalized field values keyed by field name
pub type FieldValues = BTreeMap<String, Value>;

/// A persisted record of some collection
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: FieldValues,
}

impl Document {
    pub fn new(id: DocumentId, fields: FieldValues) -> Self {
        Self { id, fields }
    }

    /// Field value, `Null` when absent
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    /// Human-readable label used in confirmation messages
    pub fn display_name(&self, schema: &EntitySchema) -> String {
        match self.get(schema.display_field) {
            Value::Text(text) => text.clone(),
            Value::Null => self.id.to_string(),
            other => other.to_json().to_string(),
        }
    }
}
