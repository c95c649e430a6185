use std::ops::Range;

/// How many page links to show on each side of the current page.
pub const PAGE_WINDOW: usize = 2;

/// Resolved page position for one gallery render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page actually shown, after clamping.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Items per page; 0 shows everything on a single page.
    pub page_size: usize,
}

impl Pagination {
    /// Clamp `requested` into `[1, total_pages]`.
    pub fn new(total_items: usize, page_size: usize, requested: usize) -> Self {
        let total_pages = if page_size == 0 {
            1
        } else {
            total_items.div_ceil(page_size).max(1)
        };
        Self {
            page: requested.clamp(1, total_pages),
            total_pages,
            total_items,
            page_size,
        }
    }

    /// Index range of the current page within the full listing.
    pub fn window(&self) -> Range<usize> {
        if self.page_size == 0 {
            return 0..self.total_items;
        }
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.total_items);
        start.min(end)..end
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Page numbers linked around the current page.
    pub fn nearby_pages(&self) -> std::ops::RangeInclusive<usize> {
        let first = self.page.saturating_sub(PAGE_WINDOW).max(1);
        let last = (self.page + PAGE_WINDOW).min(self.total_pages);
        first..=last
    }
}

/// Lenient `?page=` parsing: missing, empty or non-numeric means page 1, and
/// anything below 1 is raised to 1. Oversized numbers saturate so they still
/// clamp to the last page.
pub fn parse_page(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim) else {
        return 1;
    };
    match raw.parse::<i64>() {
        Ok(n) => usize::try_from(n.max(1)).unwrap_or(usize::MAX),
        Err(_) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => usize::MAX,
        Err(_) => 1,
    }
}
