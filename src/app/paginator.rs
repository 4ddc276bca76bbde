use serde::Serialize;

/// Items per list page unless PAGE_SIZE overrides it.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Slices an ordered collection into 1-indexed pages. Page resolution fails
/// closed: a non-numeric page number falls back to the first page, anything
/// outside the valid range clamps to the last page. An empty collection
/// still has exactly one (empty) page.
pub struct Paginator {
    total: i64,
    page_size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub number: i64,
    pub num_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
    #[serde(skip)]
    pub offset: i64,
    #[serde(skip)]
    pub limit: i64,
}

impl Paginator {
    pub fn new(total: i64, page_size: i64) -> Self {
        // Config rejects a non-positive PAGE_SIZE at startup; clamping here
        // keeps direct construction panic-free as well.
        Self {
            total: total.max(0),
            page_size: page_size.max(1),
        }
    }

    pub fn num_pages(&self) -> i64 {
        if self.total == 0 {
            return 1;
        }
        (self.total + self.page_size - 1) / self.page_size
    }

    pub fn get_page(&self, raw: Option<&str>) -> Page {
        let num_pages = self.num_pages();
        let number = match raw {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                // Out-of-range requests return the nearest valid page; the
                // last page also covers numbers below 1.
                Ok(n) if n < 1 => num_pages,
                Ok(n) => n.min(num_pages),
                Err(_) => 1,
            },
        };

        Page {
            number,
            num_pages,
            has_next: number < num_pages,
            has_previous: number > 1,
            offset: (number - 1) * self.page_size,
            limit: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_a_full_collection() {
        let page = Paginator::new(13, 10).get_page(None);
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 2);
        assert_eq!(page.offset, 0);
        assert_eq!(page.limit, 10);
        assert!(page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn second_page_holds_the_remainder() {
        let page = Paginator::new(13, 10).get_page(Some("2"));
        assert_eq!(page.number, 2);
        assert_eq!(page.offset, 10);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn beyond_the_last_page_clamps_to_the_last() {
        let page = Paginator::new(13, 10).get_page(Some("999"));
        assert_eq!(page.number, 2);
    }

    #[test]
    fn non_numeric_input_returns_page_one() {
        let page = Paginator::new(13, 10).get_page(Some("abc"));
        assert_eq!(page.number, 1);
    }

    #[test]
    fn numbers_below_one_return_the_last_page() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.get_page(Some("0")).number, 3);
        assert_eq!(paginator.get_page(Some("-4")).number, 3);
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let page = Paginator::new(0, 10).get_page(None);
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn non_positive_page_size_behaves_as_one() {
        let page = Paginator::new(3, 0).get_page(None);
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.limit, 1);
    }

    #[test]
    fn exact_multiple_has_no_phantom_page() {
        let paginator = Paginator::new(20, 10);
        assert_eq!(paginator.num_pages(), 2);
        assert_eq!(paginator.get_page(Some("3")).number, 2);
    }
}
