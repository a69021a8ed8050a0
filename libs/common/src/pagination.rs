//! Pagination helpers for list endpoints
//!
//! Every paginated endpoint takes `page`/`limit` query parameters and
//! responds with the same pagination envelope. Limits are capped so a
//! client cannot request unbounded result sets.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not send `limit`
pub const DEFAULT_LIMIT: i64 = 20;
/// Hard cap on page size
pub const MAX_LIMIT: i64 = 100;

/// Raw `page`/`limit` query parameters as sent by the client
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Normalized pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub limit: i64,
}

impl Page {
    /// Clamp raw parameters into a valid window: page >= 1,
    /// 1 <= limit <= MAX_LIMIT, defaulting to DEFAULT_LIMIT.
    pub fn from_params(params: &PageParams) -> Self {
        let number = params.page.unwrap_or(1).max(1);
        let limit = params
            .limit
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        Self { number, limit }
    }

    /// SQL OFFSET for this window
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.limit
    }
}

/// Pagination envelope attached to list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: Page, total_count: i64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + page.limit - 1) / page.limit
        };

        Self {
            current_page: page.number,
            total_pages,
            total_count,
            has_next_page: page.number < total_pages,
            has_prev_page: page.number > 1,
            limit: page.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::from_params(&PageParams::default());
        assert_eq!(page.number, 1);
        assert_eq!(page.limit, DEFAULT_LIMIT);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_limit_is_capped() {
        let page = Page::from_params(&PageParams {
            page: Some(3),
            limit: Some(500),
        });
        assert_eq!(page.limit, MAX_LIMIT);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn test_non_positive_values_are_clamped() {
        let page = Page::from_params(&PageParams {
            page: Some(0),
            limit: Some(-4),
        });
        assert_eq!(page.number, 1);
        assert_eq!(page.limit, 1);
    }

    #[test]
    fn test_envelope_math() {
        let page = Page {
            number: 2,
            limit: 20,
        };
        let p = Pagination::new(page, 45);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);

        let last = Pagination::new(
            Page {
                number: 3,
                limit: 20,
            },
            45,
        );
        assert!(!last.has_next_page);
    }

    #[test]
    fn test_empty_result_set() {
        let p = Pagination::new(
            Page {
                number: 1,
                limit: 20,
            },
            0,
        );
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
        assert!(!p.has_prev_page);
    }
}
