//! Entity schema descriptors
//!
//! A collection is described entirely by an [`EntitySchema`]: its stored fields
//! with their normalization and validation rules, the query parameters it
//! accepts as filters, the fields it can be sorted by, and any fields computed
//! at response time. The validation engine, filter builder, SQL compiler and
//! response mapper are all driven from this one table.

use crate::models::{Document, Value};

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
}

/// Value used for defaulted and generated fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fallback {
    Bool(bool),
    Integer(i64),
    Now,
}

impl Fallback {
    pub fn resolve(&self, now: chrono::DateTime<chrono::Utc>) -> Value {
        match self {
            Fallback::Bool(b) => Value::Bool(*b),
            Fallback::Integer(i) => Value::Integer(*i),
            Fallback::Now => Value::Timestamp(now),
        }
    }
}

/// Whether a field must be supplied on creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence {
    /// Must be present on creation
    Required,
    /// May be absent; stored as null
    Optional,
    /// Takes the fallback when absent on creation
    Default(Fallback),
    /// Always set by the service; client input is ignored
    Generated(Fallback),
}

/// A numeric bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Inclusive(f64),
    Exclusive(f64),
}

impl Limit {
    pub fn value(&self) -> f64 {
        match self {
            Limit::Inclusive(v) | Limit::Exclusive(v) => *v,
        }
    }
}

/// Normalization and validation rules.
///
/// Rules run in a fixed phase order regardless of the order they are listed
/// in: trim, blank-as-null, non-empty, max length, case folding, numeric
/// bounds, year window, rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Strip surrounding whitespace
    Trim,
    /// Whitespace-only text becomes absent instead of an error
    BlankAsNull,
    /// Text must contain a non-whitespace character
    NonEmpty,
    /// Maximum length in characters
    MaxLength(usize),
    /// Capitalize the first letter of every word, lowercase the rest
    TitleCase,
    Lowercase,
    Range {
        min: Option<Limit>,
        max: Option<Limit>,
    },
    /// Year between `min` and the current calendar year
    YearUpToCurrent { min: i64 },
    /// Round to the given number of decimal places
    Round(u32),
    /// Bool accepts any text; true iff it is "true", "1" or "yes"
    TruthyText,
}

/// A stored field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub rules: &'static [Rule],
}

impl FieldSpec {
    pub fn has_rule(&self, rule: Rule) -> bool {
        self.rules.contains(&rule)
    }

    pub fn max_length(&self) -> Option<usize> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::MaxLength(n) => Some(*n),
            _ => None,
        })
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.presence, Presence::Optional)
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.presence, Presence::Generated(_))
    }
}

/// A query parameter understood by the search endpoint
#[derive(Debug, Clone, Copy)]
pub enum FilterSpec {
    /// Case-insensitive substring match on a text field
    Contains {
        param: &'static str,
        field: &'static str,
    },
    /// Inclusive bounds on a numeric field; `floor` is the smallest accepted bound
    Range {
        field: &'static str,
        min_param: &'static str,
        max_param: &'static str,
        floor: Option<f64>,
    },
    /// Exact match
    Equals {
        param: &'static str,
        field: &'static str,
    },
}

/// A response-only field derived from stored values
#[derive(Clone, Copy)]
pub struct ComputedField {
    pub name: &'static str,
    pub compute: fn(&Document) -> Value,
}

impl std::fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedField").field("name", &self.name).finish()
    }
}

/// Declarative description of a collection
#[derive(Debug)]
pub struct EntitySchema {
    /// Collection name: table name, URL segment and list response key
    pub collection: &'static str,
    /// Singular name used in messages ("Book")
    pub entity_name: &'static str,
    /// Field quoted in deletion messages
    pub display_field: &'static str,
    pub fields: &'static [FieldSpec],
    pub filters: &'static [FilterSpec],
    pub sortable: &'static [&'static str],
    /// Fields indexed in storage
    pub indexes: &'static [&'static str],
    pub computed: &'static [ComputedField],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Resolve a sort key to its static field name
    pub fn sortable_field(&self, name: &str) -> Option<&'static str> {
        self.sortable.iter().copied().find(|field| *field == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Text fields matched by a contains filter
    pub fn searchable_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.iter().filter_map(|filter| match filter {
            FilterSpec::Contains { field, .. } => Some(*field),
            _ => None,
        })
    }
}
