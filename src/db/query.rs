//! SQL generation for collection tables
//!
//! Both supported drivers use `?` placeholders, so one statement text serves
//! SQLite and MySQL alike. Column names only ever come from an
//! [`EntitySchema`]; user input is always bound as a parameter.

use crate::models::{
    DocumentId, EntitySchema, FieldValues, Filter, PageRequest, Predicate, SortSpec, Value,
};

/// Escape character used in LIKE patterns
const LIKE_ESCAPE: char = '!';

/// Statement text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Comma-separated column list, id first
fn column_list(schema: &EntitySchema) -> String {
    std::iter::once("id")
        .chain(schema.column_names())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Column holding the case-folded copy of a searchable text field
pub fn search_column(field: &str) -> String {
    format!("{}_folded", field)
}

/// Case folding shared by stored search copies and search needles.
///
/// SQLite's `LOWER` only folds ASCII, so folding happens here for both sides.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

fn folded(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Text(text)) => Value::Text(fold_case(text)),
        _ => Value::Null,
    }
}

/// Escape LIKE wildcards so the needle matches literally
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// ` WHERE ...` for a non-empty filter, empty otherwise
fn where_clause(filter: &Filter, params: &mut Vec<Value>) -> String {
    let mut conditions = Vec::new();

    for predicate in filter.predicates() {
        match predicate {
            Predicate::TextContains { field, needle } => {
                conditions.push(format!(
                    "{} LIKE ? ESCAPE '{}'",
                    search_column(field),
                    LIKE_ESCAPE
                ));
                params.push(Value::Text(format!("%{}%", escape_like(&fold_case(needle)))));
            }
            Predicate::NumericRange { field, min, max } => {
                if let Some(min) = min {
                    conditions.push(format!("{} >= ?", field));
                    params.push(min.clone());
                }
                if let Some(max) = max {
                    conditions.push(format!("{} <= ?", field));
                    params.push(max.clone());
                }
            }
            Predicate::Equals { field, value } => {
                conditions.push(format!("{} = ?", field));
                params.push(value.clone());
            }
        }
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// Count of documents matching `filter`
pub fn count(schema: &EntitySchema, filter: &Filter) -> CompiledQuery {
    let mut params = Vec::new();
    let clause = where_clause(filter, &mut params);
    CompiledQuery {
        sql: format!("SELECT COUNT(*) AS count FROM {}{}", schema.collection, clause),
        params,
    }
}

/// One page of documents matching `filter`.
///
/// A sort adds `id` as a tie-breaker so pages never overlap.
pub fn select_page(
    schema: &EntitySchema,
    filter: &Filter,
    sort: Option<SortSpec>,
    page: PageRequest,
) -> CompiledQuery {
    let mut params = Vec::new();
    let clause = where_clause(filter, &mut params);
    let order = match sort {
        Some(sort) => format!(" ORDER BY {} {}, id ASC", sort.field, sort.direction.as_sql()),
        None => String::new(),
    };

    params.push(Value::Integer(page.limit()));
    params.push(Value::Integer(page.offset()));

    CompiledQuery {
        sql: format!(
            "SELECT {} FROM {}{}{} LIMIT ? OFFSET ?",
            column_list(schema),
            schema.collection,
            clause,
            order
        ),
        params,
    }
}

pub fn select_by_id(schema: &EntitySchema, id: &DocumentId) -> CompiledQuery {
    CompiledQuery {
        sql: format!(
            "SELECT {} FROM {} WHERE id = ?",
            column_list(schema),
            schema.collection
        ),
        params: vec![Value::Text(id.to_hex())],
    }
}

/// Insert every schema field plus the folded search copies; absent values
/// are stored as NULL
pub fn insert(schema: &EntitySchema, id: &DocumentId, values: &FieldValues) -> CompiledQuery {
    let mut columns = column_list(schema);
    let mut params = vec![Value::Text(id.to_hex())];
    params.extend(
        schema
            .fields
            .iter()
            .map(|field| values.get(field.name).cloned().unwrap_or(Value::Null)),
    );
    for field in schema.searchable_fields() {
        columns.push_str(", ");
        columns.push_str(&search_column(field));
        params.push(folded(values.get(field)));
    }
    let placeholders = vec!["?"; params.len()].join(", ");

    CompiledQuery {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.collection, columns, placeholders
        ),
        params,
    }
}

/// Overwrite the changed fields only. Keys the schema does not know are skipped.
pub fn update(schema: &EntitySchema, id: &DocumentId, changes: &FieldValues) -> CompiledQuery {
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for field in schema.fields {
        if let Some(value) = changes.get(field.name) {
            assignments.push(format!("{} = ?", field.name));
            params.push(value.clone());
        }
    }
    for field in schema.searchable_fields() {
        if let Some(value) = changes.get(field) {
            assignments.push(format!("{} = ?", search_column(field)));
            params.push(folded(Some(value)));
        }
    }
    params.push(Value::Text(id.to_hex()));

    CompiledQuery {
        sql: format!(
            "UPDATE {} SET {} WHERE id = ?",
            schema.collection,
            assignments.join(", ")
        ),
        params,
    }
}

pub fn delete(schema: &EntitySchema, id: &DocumentId) -> CompiledQuery {
    CompiledQuery {
        sql: format!("DELETE FROM {} WHERE id = ?", schema.collection),
        params: vec![Value::Text(id.to_hex())],
    }
}
