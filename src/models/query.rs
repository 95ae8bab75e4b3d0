//! Query primitives: filters, sorting and pagination

use serde::{Deserialize, Serialize};

use crate::models::Value;

/// A single match condition over one field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match; the needle is matched literally
    TextContains { field: &'static str, needle: String },
    /// Inclusive bounds; at least one side is set
    NumericRange {
        field: &'static str,
        min: Option<Value>,
        max: Option<Value>,
    },
    Equals { field: &'static str, value: Value },
}

/// Conjunction of predicates; empty matches every document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort on a single declared sortable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub direction: SortDirection,
}

/// 1-indexed page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Whether the request lies within `1..` pages and `1..=max_page_size` items
    pub fn is_valid(&self, max_page_size: u32) -> bool {
        self.page >= 1 && self.page_size >= 1 && self.page_size <= max_page_size
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.page_size as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

/// One page of results plus the total match count
#[derive(Debug, Clone)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    /// Number of pages; an empty result still has one page
    pub fn total_pages(&self) -> u64 {
        if self.total == 0 || self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_result_has_one_page() {
        let result: PageResult<()> = PageResult::new(vec![], 0, PageRequest::new(1, 10));
        assert_eq!(result.total_pages(), 1);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let result: PageResult<()> = PageResult::new(vec![], 25, PageRequest::new(3, 10));
        assert_eq!(result.total_pages(), 3);
        let exact: PageResult<()> = PageResult::new(vec![], 30, PageRequest::new(1, 10));
        assert_eq!(exact.total_pages(), 3);
    }

    #[test]
    fn test_offset_and_limit() {
        let request = PageRequest::new(3, 10);
        assert_eq!(request.offset(), 20);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(1, 100).is_valid(100));
        assert!(!PageRequest::new(0, 10).is_valid(100));
        assert!(!PageRequest::new(1, 0).is_valid(100));
        assert!(!PageRequest::new(1, 101).is_valid(100));
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("asc"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }

    proptest! {
        #[test]
        fn pages_cover_every_item(total in 0u64..10_000, page_size in 1u32..=100) {
            let result: PageResult<()> =
                PageResult::new(vec![], total, PageRequest::new(1, page_size));
            let pages = result.total_pages();
            prop_assert!(pages >= 1);
            prop_assert!(pages * page_size as u64 >= total);
            if total > 0 {
                prop_assert!((pages - 1) * (page_size as u64) < total);
            }
        }
    }
}
