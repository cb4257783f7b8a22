use serde::Serialize;
use std::num::IntErrorKind;
use utoipa::ToSchema;

pub const HOME_PAGE_SIZE: u64 = 6;
pub const PROFILE_PAGE_SIZE: u64 = 6;
pub const POST_LIST_PAGE_SIZE: u64 = 9;
pub const TAG_POSTS_PAGE_SIZE: u64 = 9;
pub const OUR_WORK_PAGE_SIZE: u64 = 9;
pub const MODEL_LIST_PAGE_SIZE: u64 = 12;
pub const MY_MODELS_PAGE_SIZE: u64 = 12;
pub const DASHBOARD_PAGE_SIZE: u64 = 12;
pub const USAGE_LOG_PAGE_SIZE: u64 = 20;

/// A resolved 1-based page over `total` rows.
///
/// Requested page numbers never fail: anything that does not parse as an
/// integer means page 1, and integers outside `1..=num_pages` are clamped.
/// An empty result set still has one (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub page_size: u64,
    pub total: u64,
}

impl PageWindow {
    pub fn resolve(raw_page: Option<&str>, total: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let num_pages = total.div_ceil(page_size).max(1);
        let number = match raw_page.map(|raw| raw.trim().parse::<i64>()) {
            Some(Ok(requested)) if requested >= 1 => (requested as u64).min(num_pages),
            // too many digits for i64 is still past the last page
            Some(Err(e)) if *e.kind() == IntErrorKind::PosOverflow => num_pages,
            _ => 1,
        };
        Self {
            number,
            num_pages,
            page_size,
            total,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.page_size
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            total: self.total,
            page: self.number,
            page_size: self.page_size,
            total_pages: self.num_pages,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
        }
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Rows matching the filters across all pages
    pub total: u64,
    /// Current page (1-based, after clamping)
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_malformed_page_is_first() {
        let w = PageWindow::resolve(None, 30, 9);
        assert_eq!(w.number, 1);
        assert_eq!(PageWindow::resolve(Some("abc"), 30, 9).number, 1);
        assert_eq!(PageWindow::resolve(Some(""), 30, 9).number, 1);
        assert_eq!(PageWindow::resolve(Some("2.5"), 30, 9).number, 1);
    }

    #[test]
    fn out_of_range_pages_clamp() {
        assert_eq!(PageWindow::resolve(Some("0"), 30, 9).number, 1);
        assert_eq!(PageWindow::resolve(Some("-4"), 30, 9).number, 1);
        let last = PageWindow::resolve(Some("99"), 30, 9);
        assert_eq!(last.num_pages, 4);
        assert_eq!(last.number, 4);
        assert_eq!(last.offset(), 27);
        assert!(!last.has_next());
        assert!(last.has_previous());

        assert_eq!(PageWindow::resolve(Some("99999999999999999999"), 30, 9).number, 4);
        assert_eq!(PageWindow::resolve(Some(" 99999999999999999999 "), 30, 9).number, 4);
        assert_eq!(PageWindow::resolve(Some("-99999999999999999999"), 30, 9).number, 1);
        assert_eq!(PageWindow::resolve(Some("9e99"), 30, 9).number, 1);
    }

    #[test]
    fn empty_result_is_one_empty_page() {
        let w = PageWindow::resolve(Some("3"), 0, 12);
        assert_eq!(w.number, 1);
        assert_eq!(w.num_pages, 1);
        assert_eq!(w.offset(), 0);
        let page = w.into_page(Vec::<u8>::new());
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert!(!page.has_previous);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn middle_page_has_both_neighbours() {
        let w = PageWindow::resolve(Some(" 2 "), 13, 6);
        assert_eq!(w.number, 2);
        assert_eq!(w.num_pages, 3);
        assert_eq!(w.offset(), 6);
        assert!(w.has_next());
        assert!(w.has_previous());
    }
}
