use crate::query::PageSize;

/// Number of page buttons rendered at most.
pub const PAGE_WINDOW: u32 = 5;

/// One page of a collection as returned by the fetch collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> ListPage<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }
}

/// `max(1, ceil(total_count / page_size))`.
pub fn total_pages(total_count: u64, page_size: PageSize) -> u32 {
    let pages = total_count.div_ceil(u64::from(page_size.get()));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Clamps a requested page into `[1, total_pages]`; without a known total only
/// the lower bound applies.
pub fn clamp_page(page: u32, total_pages: Option<u32>) -> u32 {
    let page = page.max(1);
    match total_pages {
        Some(total) => page.min(total.max(1)),
        None => page,
    }
}

/// Page numbers to render: every page when there are at most five, otherwise a
/// window starting two pages before the current one.
pub fn page_window(current_page: u32, total_pages: u32) -> Vec<u32> {
    let total_pages = total_pages.max(1);
    if total_pages <= PAGE_WINDOW {
        return (1..=total_pages).collect();
    }

    let current_page = current_page.clamp(1, total_pages);
    let start = current_page.saturating_sub(2).max(1);
    let end = total_pages.min(start + PAGE_WINDOW - 1);
    (start..=end).collect()
}

pub fn has_previous(current_page: u32) -> bool {
    current_page > 1
}

pub fn has_next(current_page: u32, total_pages: u32) -> bool {
    current_page < total_pages
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
