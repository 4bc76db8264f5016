/// Page-number pagination
///
/// `?page=N`, 1-based. Responses look like
/// `{"count": .., "next": url|null, "previous": url|null, "results": [..]}`.

use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Anything other than a positive integer is an invalid page
    pub fn parse(page: Option<&str>, page_size: i64) -> Result<Self, AppError> {
        let page = match page {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or(AppError::InvalidPage)?,
        };

        Ok(Self {
            page,
            page_size: page_size.max(1),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn num_pages(&self, count: i64) -> i64 {
        if count <= 0 {
            1
        } else {
            (count + self.page_size - 1) / self.page_size
        }
    }

    /// The first page always exists, even when empty
    pub fn ensure_exists(&self, count: i64) -> Result<(), AppError> {
        if self.page > self.num_pages(count) {
            return Err(AppError::InvalidPage);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, request: PageRequest, base_url: &str) -> Self {
        let next = (request.page < request.num_pages(count))
            .then(|| page_link(base_url, request.page + 1));
        let previous = (request.page > 1).then(|| page_link(base_url, request.page - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(base_url: &str, page: i64) -> String {
    if page == 1 {
        base_url.to_string()
    } else {
        format!("{}?page={}", base_url, page)
    }
}

/// Absolute URL of the current path without its query string
pub fn absolute_url(req: &HttpRequest) -> String {
    let info = req.connection_info();
    format!("{}://{}{}", info.scheme(), info.host(), req.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://testserver/api/v1/boards/posts";

    #[test]
    fn test_parse_defaults_to_first_page() {
        let request = PageRequest::parse(None, 10).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["0", "-1", "abc", "1.5", ""] {
            assert!(
                matches!(PageRequest::parse(Some(raw), 10), Err(AppError::InvalidPage)),
                "page {:?} should be invalid",
                raw
            );
        }
    }

    #[test]
    fn test_offset_and_page_count() {
        let request = PageRequest::parse(Some("3"), 10).unwrap();
        assert_eq!(request.offset(), 20);
        assert_eq!(request.num_pages(0), 1);
        assert_eq!(request.num_pages(10), 1);
        assert_eq!(request.num_pages(11), 2);
    }

    #[test]
    fn test_pages_past_the_end_do_not_exist() {
        let request = PageRequest::parse(Some("2"), 10).unwrap();
        assert!(request.ensure_exists(11).is_ok());
        assert!(request.ensure_exists(10).is_err());

        let first = PageRequest::parse(None, 10).unwrap();
        assert!(first.ensure_exists(0).is_ok());
    }

    #[test]
    fn test_links() {
        let middle = Page::new(vec![1], 25, PageRequest::parse(Some("2"), 10).unwrap(), BASE);
        assert_eq!(middle.next.as_deref(), Some(format!("{}?page=3", BASE).as_str()));
        // page 1 is linked without a query parameter
        assert_eq!(middle.previous.as_deref(), Some(BASE));

        let last = Page::new(vec![1], 25, PageRequest::parse(Some("3"), 10).unwrap(), BASE);
        assert!(last.next.is_none());
        assert_eq!(last.previous.as_deref(), Some(format!("{}?page=2", BASE).as_str()));

        let only = Page::<i32>::new(vec![], 0, PageRequest::parse(None, 10).unwrap(), BASE);
        assert!(only.next.is_none());
        assert!(only.previous.is_none());
    }

    #[test]
    fn test_absolute_url_drops_query() {
        let req = actix_web::test::TestRequest::get()
            .uri("/api/v1/boards/posts?page=2")
            .insert_header(("Host", "testserver"))
            .to_http_request();
        assert_eq!(absolute_url(&req), BASE);
    }
}
