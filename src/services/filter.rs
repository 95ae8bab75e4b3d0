//! Search filter builder
//!
//! Maps query parameters onto the [`FilterSpec`]s a collection declares and
//! produces a [`Filter`]. Parameters the schema does not declare are ignored.

use std::collections::HashMap;

use crate::models::{EntitySchema, FieldKind, Filter, FilterSpec, Predicate, Value};
use crate::services::validation::{is_truthy, ValidationErrors};

/// Error building a filter from query parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid filter parameters: {0}")]
    Invalid(ValidationErrors),
    #[error("{max_param} cannot be less than {min_param}")]
    InvalidRange {
        min_param: &'static str,
        max_param: &'static str,
    },
}

/// Build the conjunction of every supplied, declared filter parameter
pub fn build_filter(
    schema: &EntitySchema,
    params: &HashMap<String, String>,
) -> Result<Filter, FilterError> {
    let mut filter = Filter::all();
    let mut errors = ValidationErrors::new();

    for spec in schema.filters {
        match *spec {
            FilterSpec::Contains { param, field } => {
                if let Some(needle) = supplied(params, param) {
                    filter.push(Predicate::TextContains {
                        field,
                        needle: needle.to_string(),
                    });
                }
            }
            FilterSpec::Equals { param, field } => {
                let Some(raw) = supplied(params, param) else {
                    continue;
                };
                match parse_exact(schema, field, raw) {
                    Some(value) => filter.push(Predicate::Equals { field, value }),
                    None => errors.push(param, format!("Invalid value '{}'", raw)),
                }
            }
            FilterSpec::Range {
                field,
                min_param,
                max_param,
                floor,
            } => {
                let kind = schema
                    .field(field)
                    .map(|spec| spec.kind)
                    .unwrap_or(FieldKind::Float);
                let min = parse_bound(params, min_param, kind, floor, &mut errors);
                let max = parse_bound(params, max_param, kind, floor, &mut errors);

                if let (Some(low), Some(high)) = (&min, &max) {
                    if high.as_f64() < low.as_f64() {
                        return Err(FilterError::InvalidRange {
                            min_param,
                            max_param,
                        });
                    }
                }

                if min.is_some() || max.is_some() {
                    filter.push(Predicate::NumericRange { field, min, max });
                }
            }
        }
    }

    errors.into_result(filter).map_err(FilterError::Invalid)
}

/// Non-blank parameter value, trimmed
fn supplied<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_exact(schema: &EntitySchema, field: &str, raw: &str) -> Option<Value> {
    let spec = schema.field(field)?;
    match spec.kind {
        FieldKind::Bool => Some(Value::Bool(is_truthy(raw))),
        FieldKind::Integer => raw.parse::<i64>().ok().map(Value::Integer),
        FieldKind::Float => raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float),
        FieldKind::Text => Some(Value::Text(raw.to_string())),
        FieldKind::Timestamp => None,
    }
}

fn parse_bound(
    params: &HashMap<String, String>,
    param: &'static str,
    kind: FieldKind,
    floor: Option<f64>,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let raw = supplied(params, param)?;

    let value = match kind {
        FieldKind::Integer => raw.parse::<i64>().ok().map(Value::Integer),
        _ => raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float),
    };
    let Some(value) = value else {
        errors.push(param, "Input should be a valid number");
        return None;
    };

    if let (Some(floor), Some(number)) = (floor, value.as_f64()) {
        if number < floor {
            errors.push(param, format!("Input should be greater than or equal to {}", floor));
            return None;
        }
    }

    Some(value)
}
