//! Pagination primitives shared by listings.

use serde::{Deserialize, Serialize};

/// Requested page (1-based).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Clamp out-of-range values: page < 1 becomes 1 and a zero page size
    /// falls back to `default_size`.
    pub fn normalize(self, default_size: u32) -> Self {
        Self {
            page: self.page.max(1),
            page_size: if self.page_size < 1 { default_size } else { self.page_size },
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.page_size as u64
    }
}

/// One page of results plus the counters needed to render a pager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page_number: request.page,
            page_size: request.page_size,
        }
    }

    /// Slice an already filtered and ordered collection.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(items, total_count, request)
    }

    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size as u64) as u32
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_page_and_size() {
        let req = PageRequest::new(0, 0).normalize(12);
        assert_eq!(req, PageRequest::new(1, 12));
        assert_eq!(req.offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn pager_counters() {
        let page = Page::from_vec((1..=25).collect::<Vec<_>>(), PageRequest::new(2, 10));
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_previous());
        assert!(page.has_next());

        let last = Page::from_vec((1..=25).collect::<Vec<_>>(), PageRequest::new(3, 10));
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_next());
    }

    #[test]
    fn empty_page_has_no_neighbours() {
        let page: Page<u8> = Page::from_vec(vec![], PageRequest::new(1, 12));
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_previous());
        assert!(!page.has_next());
    }
}
