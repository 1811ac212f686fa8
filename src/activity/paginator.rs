// Paginator — fixed-size, 1-based pages over either a server-reported total
// or a client-held filtered list.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Page size used by every surface unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Page position within a collection of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page: usize,
    page_size: usize,
    total: usize,
}

impl Pagination {
    /// Start on page 1. A zero page size is treated as 1.
    pub fn new(page_size: usize, total: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total,
        }
    }

    /// Position on `page`, clamped into `1..=total_pages`.
    pub fn at(page: usize, page_size: usize, total: usize) -> Self {
        let mut p = Self::new(page_size, total);
        p.page = page.clamp(1, p.total_pages());
        p
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// `ceil(total / page_size)`, never less than 1.
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether `page` is a valid destination.
    pub fn contains(&self, page: usize) -> bool {
        (1..=self.total_pages()).contains(&page)
    }

    /// Move to `page`. Out-of-range pages leave the position unchanged and
    /// return false.
    pub fn go_to(&mut self, page: usize) -> bool {
        if !self.contains(page) {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.page + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.go_to(self.page.saturating_sub(1))
    }

    /// Index range of the current page: `[(page-1)*size, page*size)`,
    /// truncated at `total`.
    pub fn range(&self) -> Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(self.total);
        let end = (self.page * self.page_size).min(self.total);
        start..end
    }

    /// Slice the current page out of a fully materialized list.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        &items[start..end]
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, 0)
    }
}
