//! Newest-first paging over the retained line sequence.
//!
//! Page 1 always shows the newest lines. With `total` lines and page size
//! `size`, page `p` covers the half-open range
//! `[max(0, total - p*size), max(0, total - (p-1)*size))` in arrival order,
//! so a partial page is always the oldest one.

use std::ops::Range;

use serde::Serialize;

/// Current page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: usize,
    page_size: usize,
}

/// What a view needs to label the page it is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub page_count: usize,
    pub total_lines: usize,
}

impl PageWindow {
    /// Page size is floored at 1
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages needed for `total` lines; 0 when there are none
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    /// Highest selectable page; page 1 is always selectable
    pub fn last_page(&self, total: usize) -> usize {
        self.page_count(total).max(1)
    }

    /// Select `requested`, clamped to `1..=last_page`. Returns the page in effect.
    pub fn set_page(&mut self, requested: usize, total: usize) -> usize {
        self.page = requested.clamp(1, self.last_page(total));
        self.page
    }

    /// Re-clamp after the line count changed
    pub fn clamp(&mut self, total: usize) -> usize {
        self.set_page(self.page, total)
    }

    /// Line indices covered by the current page
    pub fn range(&self, total: usize) -> Range<usize> {
        let start = total.saturating_sub(self.page * self.page_size);
        let end = total.saturating_sub((self.page - 1) * self.page_size);
        start..end
    }

    pub fn info(&self, total: usize) -> PageInfo {
        PageInfo {
            page: self.page,
            page_count: self.page_count(total),
            total_lines: total,
        }
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PAGE_SIZE)
    }
}
