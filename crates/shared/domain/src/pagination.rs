//! Pagination arithmetic for list queries.

use crate::constants::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Normalized page request.
///
/// Pages are 1-based. `page < 1` is treated as the first page, `page_size < 1`
/// falls back to [`DEFAULT_PAGE_SIZE`] and anything above [`MAX_PAGE_SIZE`] is capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    page_size: u64,
}

impl Pagination {
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page < 1 {
            DEFAULT_PAGE_NUMBER
        } else {
            page as u64
        };
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            (page_size as u64).min(MAX_PAGE_SIZE)
        };

        Self { page, page_size }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Rows to skip before the requested page
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// Convert a raw (page, page_size) pair into a row offset.
pub fn compute_offset(page: i64, page_size: i64) -> u64 {
    Pagination::new(page, page_size).offset()
}
