//! Pagination Window
//!
//! The single implementation of page math, shared by the query resolver and
//! the render enumerator so a static build produces exactly the page count
//! the live resolver reports.
//!
//! - `perPage` = `perPage` argument, else `limit`, else the configured
//!   default; clamped to `[1, max_per_page]`
//! - `page` is clamped to at least 1
//! - `skip` applies before page slicing: offset = `(page-1)*perPage + skip`
//! - `totalCount` = `max(matched - skip, 0)`, capped by `limit`
//! - `totalPages` = `max(ceil(totalCount / perPage), 1)`

use crate::config::EngineConfig;
use crate::models::{PageInfo, QueryArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub per_page: usize,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl PageWindow {
    pub fn from_args(args: &QueryArgs, config: &EngineConfig) -> Self {
        let per_page = args
            .per_page
            .or(args.limit)
            .unwrap_or(config.default_per_page)
            .clamp(1, config.max_per_page.max(1));

        Self {
            page: args.page.unwrap_or(1).max(1),
            per_page,
            skip: args.skip.unwrap_or(0),
            limit: args.limit,
        }
    }

    /// Same window, different page
    pub fn with_page(self, page: usize) -> Self {
        Self {
            page: page.max(1),
            ..self
        }
    }

    /// Index of the first node of this page within the sorted matches
    pub fn offset(&self) -> usize {
        (self.page - 1)
            .saturating_mul(self.per_page)
            .saturating_add(self.skip)
    }

    /// Maximum number of nodes on this page
    pub fn take(&self) -> usize {
        match self.limit {
            Some(limit) => {
                let consumed = (self.page - 1).saturating_mul(self.per_page);
                self.per_page.min(limit.saturating_sub(consumed))
            }
            None => self.per_page,
        }
    }

    pub fn total_count(&self, matched: usize) -> usize {
        let count = matched.saturating_sub(self.skip);
        match self.limit {
            Some(limit) => count.min(limit),
            None => count,
        }
    }

    pub fn total_pages(&self, matched: usize) -> usize {
        self.total_count(matched).div_ceil(self.per_page).max(1)
    }

    pub fn page_info(&self, matched: usize) -> PageInfo {
        let total_pages = self.total_pages(matched);
        PageInfo {
            total_pages,
            current_page: self.page,
            per_page: self.per_page,
            is_first: self.page <= 1,
            is_last: self.page >= total_pages,
            has_previous_page: self.page > 1,
            has_next_page: self.page < total_pages,
        }
    }
}
