//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_PAGE_SIZE: u64 = 10;
/// Maximum page size.
const MAX_PAGE_SIZE: u64 = 100;
/// Highest addressable page; keeps `offset()` well inside `i64`.
const MAX_PAGE: u64 = 1_000_000;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl PageRequest {
    /// Create a new page request, clamping to valid bounds.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate the SQL `OFFSET` value.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Return the SQL `LIMIT` value.
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Current page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Total number of items across all pages.
    pub total: u64,
    /// Whether items exist beyond this page (`total > page * page_size`).
    pub has_more: bool,
}

impl<T> PageResponse<T> {
    /// Create a new paginated response.
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
            has_more: total > request.page.saturating_mul(request.page_size),
        }
    }

    /// Create an empty response.
    pub fn empty(request: &PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Map every item, keeping the pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            has_more: self.has_more,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_clamping() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_huge_page_is_capped() {
        let req = PageRequest::new(u64::MAX, 10);
        assert_eq!(req.page, MAX_PAGE);
        assert!(i64::try_from(req.offset()).is_ok());

        // A request deserialized without `new` must not overflow either.
        let raw = PageRequest {
            page: u64::MAX,
            page_size: u64::MAX,
        };
        assert_eq!(raw.offset(), u64::MAX);
    }

    #[test]
    fn test_has_more_boundaries() {
        let first = PageRequest::new(1, 10);
        assert!(PageResponse::new(vec![0u8; 10], &first, 15).has_more);
        assert!(!PageResponse::new(vec![0u8; 10], &first, 10).has_more);

        let second = PageRequest::new(2, 10);
        let page = PageResponse::new(vec![0u8; 5], &second, 15);
        assert!(!page.has_more);
        assert_eq!(page.total, 15);
    }

    #[test]
    fn test_empty() {
        let page: PageResponse<u8> = PageResponse::empty(&PageRequest::default());
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.page_size, 10);
    }
}
