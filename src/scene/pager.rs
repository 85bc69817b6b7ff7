//! Page state of a paged scene
//!
//! Tracks the current page and, per page, the throttle column that was
//! selected when the page was left, so returning to a page restores it.

use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    selected: Vec<Option<usize>>,
}

impl Pager {
    /// Pager over `page_count` pages (at least one)
    pub fn new(page_count: usize) -> Self {
        Self {
            page: 0,
            selected: vec![None; page_count.max(1)],
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.selected.len()
    }

    /// Whether `page` is a valid target
    pub fn is_valid(&self, page: usize) -> bool {
        if page < self.page_count() {
            true
        } else {
            warn!("Page {} out of range (0..{})", page, self.page_count());
            false
        }
    }

    /// Move to `page`; callers tear down before and rebuild after
    pub fn set_page(&mut self, page: usize) -> bool {
        if !self.is_valid(page) {
            return false;
        }
        self.page = page;
        info!("Page {}/{}", page + 1, self.page_count());
        true
    }

    /// Selection remembered for the current page
    pub fn selected(&self) -> Option<usize> {
        self.selected[self.page]
    }

    /// Remember the selection of the current page
    pub fn remember(&mut self, selected: Option<usize>) {
        self.selected[self.page] = selected;
    }
}
