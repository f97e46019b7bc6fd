//! Page-number pagination for the contact listings.
//!
//! Page lookup is lenient: a missing or malformed page number falls back to
//! the first page and an out-of-range number falls back to the last page, so
//! a listing request never fails because of its `page` parameter.

use serde::Serialize;

pub const DEFAULT_PER_PAGE: i64 = 10;

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: i64,
    per_page: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Self {
        Self {
            count: count.max(0),
            per_page: per_page.max(1),
        }
    }

    /// Always at least one page, even for an empty listing.
    pub fn num_pages(&self) -> i64 {
        if self.count == 0 {
            1
        } else {
            (self.count + self.per_page - 1) / self.per_page
        }
    }

    pub fn get_page(&self, raw: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages();
        let number = match raw.map(|r| r.trim().parse::<i64>()) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n < 1 || n > num_pages => num_pages,
            Some(Ok(n)) => n,
        };

        PageWindow {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
        }
    }
}

/// The slice of rows a page covers, before the rows are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    /// Number of rows on this page.
    pub fn row_count(&self) -> i64 {
        (self.count - self.offset()).clamp(0, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of<T: Clone>(items: &[T], window: PageWindow) -> Vec<T> {
        items
            .iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .cloned()
            .collect()
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let contacts: Vec<i64> = (1..=25).collect();
        let paginator = Paginator::new(contacts.len() as i64, DEFAULT_PER_PAGE);
        assert_eq!(paginator.num_pages(), 3);

        let window = paginator.get_page(Some("3"));
        assert_eq!(window.number, 3);
        assert_eq!(window.row_count(), 5);
        assert_eq!(window_of(&contacts, window), vec![21, 22, 23, 24, 25]);
        assert!(!window.has_next());
        assert!(window.has_previous());
    }

    #[test]
    fn missing_or_malformed_page_is_first_page() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.get_page(None).number, 1);
        assert_eq!(paginator.get_page(Some("abc")).number, 1);
        assert_eq!(paginator.get_page(Some("2.5")).number, 1);
        assert_eq!(paginator.get_page(Some(" 2 ")).number, 2);
    }

    #[test]
    fn out_of_range_page_is_last_page() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.get_page(Some("99")).number, 3);
        assert_eq!(paginator.get_page(Some("0")).number, 3);
        assert_eq!(paginator.get_page(Some("-1")).number, 3);
    }

    #[test]
    fn empty_listing_has_one_empty_page() {
        let paginator = Paginator::new(0, 10);
        let window = paginator.get_page(Some("4"));
        assert_eq!(window.number, 1);
        assert_eq!(window.num_pages, 1);
        assert_eq!(window.row_count(), 0);

        let page = window.into_page(Vec::<i64>::new());
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn full_pages() {
        let window = Paginator::new(20, 10).get_page(Some("1"));
        assert_eq!(window.row_count(), 10);
        assert!(window.has_next());
        assert_eq!(window.offset(), 0);
    }
}
