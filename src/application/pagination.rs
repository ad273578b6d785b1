//! Page-number pagination shared by every feed.

use serde::Serialize;

/// What a caller asks for: a 1-based page number at a fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    number: u32,
    size: u32,
}

impl PageRequest {
    /// Page numbers below 1 are treated as 1; a zero size is treated as 1.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

/// One page of results plus the totals needed to render a paginator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            number: request.number(),
            page_size: request.size(),
            total,
        }
    }

    /// Number of pages; an empty result still has one (empty) page.
    pub fn num_pages(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }
        let size = u64::from(self.page_size.max(1));
        let pages = self.total.div_ceil(size);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1 && self.number <= self.num_pages()
    }

    pub fn next_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total: self.total,
        }
    }
}

/// Parse the `?page=` query value; anything unparsable falls back to page 1.
pub fn parse_page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(count: usize, number: u32, size: u32, total: u64) -> Page<usize> {
        Page::new((0..count).collect(), PageRequest::new(number, size), total)
    }

    #[test]
    fn request_clamps_to_first_page() {
        let request = PageRequest::new(0, 10);
        assert_eq!(request.number(), 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn request_offset_grows_with_page_number() {
        let request = PageRequest::new(3, 10);
        assert_eq!(request.offset(), 20);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn thirteen_items_make_two_pages() {
        let first = page_of(10, 1, 10, 13);
        assert_eq!(first.num_pages(), 2);
        assert!(first.has_next());
        assert!(!first.has_previous());
        assert_eq!(first.next_number(), Some(2));

        let second = page_of(3, 2, 10, 13);
        assert!(!second.has_next());
        assert!(second.has_previous());
        assert_eq!(second.previous_number(), Some(1));
    }

    #[test]
    fn empty_result_has_single_page() {
        let page = page_of(0, 1, 10, 0);
        assert_eq!(page.num_pages(), 1);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn page_beyond_last_is_empty_without_next() {
        let page = page_of(0, 5, 10, 13);
        assert!(page.is_empty());
        assert!(!page.has_next());
        assert_eq!(page.previous_number(), None);
    }

    #[test]
    fn map_preserves_totals() {
        let page = page_of(3, 2, 10, 13).map(|value| value * 2);
        assert_eq!(page.items, vec![0, 2, 4]);
        assert_eq!(page.total, 13);
        assert_eq!(page.number, 2);
    }

    #[test]
    fn parse_page_number_falls_back_to_one() {
        assert_eq!(parse_page_number(None), 1);
        assert_eq!(parse_page_number(Some("abc")), 1);
        assert_eq!(parse_page_number(Some("0")), 1);
        assert_eq!(parse_page_number(Some(" 2 ")), 2);
    }
}
