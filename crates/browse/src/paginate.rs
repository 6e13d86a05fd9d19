use crate::request::Window;
use serde::Serialize;

/// One page of results plus enough bookkeeping to fetch the next one.
///
/// `page` is 1-based. `total_pages` is never below 1, even for an empty
/// result, so callers can always render "page 1 of 1".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    offset: u64,
    count: u64,
    page: u64,
    total_pages: u64,
    total: u64,
    items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(window: Window, total: u64, items: Vec<T>) -> Self {
        Self {
            offset: window.offset(),
            count: len(&items),
            page: window.offset() / window.limit() + 1,
            total_pages: total.div_ceil(window.limit()).max(1),
            total,
            items,
        }
    }

    /// A result with nothing in it, as produced when no folder resolved.
    pub fn empty(window: Window) -> Self {
        Self::new(window, 0, Vec::new())
    }

    /// Every item on a single page.
    pub fn whole(items: Vec<T>) -> Self {
        let count = len(&items);
        Self { offset: 0, count, page: 1, total_pages: 1, total: count, items }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

fn len<T>(items: &[T]) -> u64 {
    // Infallible on every supported target.
    u64::try_from(items.len()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 10, 0, 1, 1)]
    #[case(0, 10, 10, 1, 1)]
    #[case(0, 10, 11, 1, 2)]
    #[case(20, 10, 25, 3, 3)]
    #[case(25, 10, 25, 3, 3)]
    #[case(100, 10, 25, 11, 3)]
    fn test_page_numbers(
        #[case] offset: i64,
        #[case] limit: i64,
        #[case] total: u64,
        #[case] page: u64,
        #[case] total_pages: u64,
    ) {
        let paginated = Paginated::<()>::new(Window::new(offset, limit).unwrap(), total, Vec::new());
        assert_eq!(paginated.page(), page);
        assert_eq!(paginated.total_pages(), total_pages);
        assert_eq!(paginated.offset(), u64::try_from(offset).unwrap());
    }

    #[test]
    fn test_count_is_page_length() {
        let paginated = Paginated::new(Window::new(0, 10).unwrap(), 25, vec!['a', 'b', 'c']);
        assert_eq!(paginated.count(), 3);
        assert_eq!(paginated.total(), 25);
    }

    #[test]
    fn test_empty() {
        let paginated = Paginated::<u8>::empty(Window::new(0, 10).unwrap());
        assert_eq!((paginated.count(), paginated.page(), paginated.total_pages()), (0, 1, 1));
        assert!(paginated.items().is_empty());
    }

    #[test]
    fn test_whole_is_one_page() {
        let paginated = Paginated::whole(vec![1, 2, 3]);
        assert_eq!((paginated.count(), paginated.total(), paginated.total_pages()), (3, 3, 1));
    }

    #[test]
    fn test_serializes_camel_case() {
        let paginated = Paginated::whole(vec!["x"]);
        let json = serde_json::to_value(&paginated).unwrap();
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["items"][0], "x");
    }
}
