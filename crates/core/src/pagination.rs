//! Offset/limit pagination computed from a page number.
//!
//! Pages are 1-based. The REST backend takes `page`/`per_page` and answers
//! with a [`Page`]; views that post-filter locally use [`paginate`] instead.

use serde::{Deserialize, Serialize};

/// Rows per page when the caller does not ask for a size.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size the storefront will request.
pub const MAX_PER_PAGE: u32 = 100;

/// A requested page, already clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Build a request from raw query parameters.
    ///
    /// Page 0 or a missing page becomes 1; `per_page` is clamped to
    /// `1..=MAX_PER_PAGE` and defaults to [`DEFAULT_PER_PAGE`].
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// Rows to take.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results as returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    /// An empty first page.
    #[must_use]
    pub const fn empty(per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page,
        }
    }

    /// Number of pages; at least one so "page 1 of 1" renders for empty lists.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let per_page = u64::from(self.per_page.max(1));
        let pages = self.total.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.page.saturating_add(1)
    }

    #[must_use]
    pub const fn prev_page(&self) -> u32 {
        if self.page > 1 { self.page - 1 } else { 1 }
    }

    /// Up to `width` page numbers centred on the current page, for pager links.
    #[must_use]
    pub fn window(&self, width: u32) -> Vec<u32> {
        let total = self.total_pages();
        let width = width.clamp(1, total);
        let half = width / 2;
        let start = self
            .page
            .saturating_sub(half)
            .max(1)
            .min(total + 1 - width);
        (start..start + width).collect()
    }

    /// Transform the items while keeping the paging metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Page through a list held locally (client-side post-filtered results).
///
/// A page past the end yields an empty `items` with correct totals.
#[must_use]
pub fn paginate<T: Clone>(all: &[T], request: PageRequest) -> Page<T> {
    let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let items = all
        .iter()
        .skip(start)
        .take(request.limit() as usize)
        .cloned()
        .collect();

    Page {
        items,
        total: all.len() as u64,
        page: request.page(),
        per_page: request.per_page(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_limit_from_page_number() {
        let request = PageRequest::new(Some(3), Some(10));
        assert_eq!(request.offset(), 20);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(Some(0), Some(0));
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), 1);

        let request = PageRequest::new(None, Some(10_000));
        assert_eq!(request.per_page(), MAX_PER_PAGE);
        assert_eq!(PageRequest::default().per_page(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_total_pages() {
        let mut page: Page<u8> = Page::empty(20);
        assert_eq!(page.total_pages(), 1);
        assert!(!page.has_next());
        page.total = 41;
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(!page.has_prev());
    }

    #[test]
    fn test_paginate_local_slice() {
        let all: Vec<u32> = (1..=25).collect();
        let page = paginate(&all, PageRequest::new(Some(3), Some(10)));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.has_next());
        assert!(page.has_prev());
    }

    #[test]
    fn test_paginate_past_end() {
        let all = vec![1, 2, 3];
        let page = paginate(&all, PageRequest::new(Some(9), Some(10)));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_window_is_centred_and_bounded() {
        let page = Page::<u8> {
            items: vec![],
            total: 200,
            page: 5,
            per_page: 20,
        };
        assert_eq!(page.window(5), vec![3, 4, 5, 6, 7]);

        let first = Page::<u8> { page: 1, ..page.clone() };
        assert_eq!(first.window(5), vec![1, 2, 3, 4, 5]);

        let last = Page::<u8> { page: 10, ..page };
        assert_eq!(last.window(5), vec![6, 7, 8, 9, 10]);

        let tiny = Page::<u8>::empty(20);
        assert_eq!(tiny.window(5), vec![1]);
    }
}
