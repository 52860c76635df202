//! Page requests and paged results
//!
//! Pages are 1-based. Out-of-range requests are clamped instead of rejected:
//! a page below 1 becomes 1, a size below 1 becomes [`DEFAULT_PAGE_SIZE`],
//! and sizes above [`MAX_PAGE_SIZE`] are capped.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Build a request from raw (possibly negative or missing) caller input.
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p.min(u32::MAX as i64) as u32,
            _ => 1,
        };
        let size = match size {
            Some(s) if s >= 1 => (s.min(MAX_PAGE_SIZE as i64)) as u32,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.size as u64
    }

    pub fn limit(&self) -> u64 {
        self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of an ordered result set plus its position in the whole.
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

impl<T> PagedList<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        let total_pages = total_count.div_ceil(request.size as u64) as u32;
        Self {
            items,
            current_page: request.page,
            page_size: request.size,
            total_count,
            total_pages,
        }
    }

    /// Slice an already ordered sequence: count first, then take the page.
    pub fn from_sequence<I>(sequence: I, request: PageRequest) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let all: Vec<T> = sequence.into_iter().collect();
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        Self::new(items, total, request)
    }

    pub fn map<U, F>(self, f: F) -> PagedList<U>
    where
        F: FnMut(T) -> U,
    {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }

    pub fn header(&self) -> PaginationHeader {
        PaginationHeader {
            current_page: self.current_page,
            items_per_page: self.page_size,
            total_items: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

/// Value of the `Pagination` response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationHeader {
    pub current_page: u32,
    pub items_per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}
