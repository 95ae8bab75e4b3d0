//! Common API utilities and shared types
//!
//! Pagination and sort parameters are shared by the list and search
//! endpoints of every collection.

use std::collections::HashMap;

use crate::config::PaginationConfig;
use crate::models::{EntitySchema, PageRequest, SortDirection, SortSpec};
use crate::services::ValidationErrors;

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Query parameters consumed by pagination and sorting, never by filters
pub const PAGINATION_PARAMS: [&str; 4] = ["page", "page_size", "sort_by", "order"];

// ============================================================================
// Pagination Query Parsing
// ============================================================================

/// Page request and optional sort parsed from query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub page: PageRequest,
    pub sort: Option<SortSpec>,
}

fn parse_bounded(
    params: &HashMap<String, String>,
    name: &str,
    default: u32,
    max: Option<u32>,
    errors: &mut ValidationErrors,
) -> u32 {
    let Some(raw) = params.get(name) else {
        return default;
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if value < 1 => {
            errors.push(name, "Input should be greater than or equal to 1");
            default
        }
        Ok(value) => match max {
            Some(max) if value > max => {
                errors.push(name, format!("Input should be less than or equal to {}", max));
                default
            }
            _ => value,
        },
        Err(_) => {
            errors.push(name, "Input should be a valid integer");
            default
        }
    }
}

/// Parse `page`, `page_size`, `sort_by` and `order`.
///
/// Every malformed parameter is reported, not just the first.
pub fn parse_list_query(
    schema: &EntitySchema,
    params: &HashMap<String, String>,
    pagination: PaginationConfig,
) -> Result<ListQuery, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let page = parse_bounded(params, "page", default_page(), None, &mut errors);
    let page_size = parse_bounded(
        params,
        "page_size",
        pagination.default_page_size,
        Some(pagination.max_page_size),
        &mut errors,
    );

    let direction = match params.get("order").map(|raw| raw.trim()) {
        None | Some("") => SortDirection::default(),
        Some(raw) => SortDirection::parse(raw).unwrap_or_else(|| {
            errors.push("order", "Input should be 'asc' or 'desc'");
            SortDirection::default()
        }),
    };

    let sort = match params.get("sort_by").map(|raw| raw.trim()) {
        None | Some("") => None,
        Some(raw) => match schema.sortable_field(raw) {
            Some(field) => Some(SortSpec { field, direction }),
            None => {
                errors.push(
                    "sort_by",
                    format!("Input should be one of: {}", schema.sortable.join(", ")),
                );
                None
            }
        },
    };

    errors.into_result(ListQuery {
        page: PageRequest::new(page, page_size),
        sort,
    })
}

/// Query parameters left for the filter builder
pub fn filter_params(params: &HashMap<String, String>) -> HashMap<String, String> {
    params
        .iter()
        .filter(|(name, _)| !PAGINATION_PARAMS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
