//! Paged listings
//!
//! The activity log is served 50 rows at a time. Out-of-range page
//! numbers are clamped instead of producing an empty page.

use serde::Serialize;

pub const PAGE_SIZE: i64 = 50;

/// Where a requested page lands once clamped to the result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-indexed
    pub page: i64,
    pub total_pages: i64,
    pub total_results: i64,
}

impl PageWindow {
    /// # Examples
    /// ```
    /// use iqac_server::pagination::PageWindow;
    ///
    /// // 120 rows = 50 + 50 + 20
    /// let w = PageWindow::clamp(120, 2);
    /// assert_eq!((w.page, w.total_pages, w.offset()), (2, 3, 50));
    ///
    /// let w = PageWindow::clamp(120, 99);
    /// assert_eq!((w.page, w.offset()), (3, 100));
    /// ```
    pub fn clamp(total_results: i64, requested_page: i64) -> Self {
        let total_results = total_results.max(0);
        let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
        let page = requested_page.clamp(1, total_pages.max(1));
        Self {
            page,
            total_pages,
            total_results,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * PAGE_SIZE
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }
}

/// JSON envelope for one page of `T`
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub entries: Vec<T>,
    pub page: i64,
    pub total_pages: i64,
    pub total_results: i64,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, entries: Vec<T>) -> Self {
        Self {
            entries,
            page: window.page,
            total_pages: window.total_pages,
            total_results: window.total_results,
        }
    }
}
