use mongodb::bson::Document;
use serde::Serialize;

use crate::core::{DbError, ErrorInfo};

/// Success/failure wrapper returned by every service operation.
///
/// Success populates `data`; failure populates `error`. Page-producing
/// operations additionally carry an empty page on failure so the UI always
/// has a renderable shape. Constructors keep those invariants; there is no
/// other way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl<T> Outcome<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(err: DbError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(err.into()),
        }
    }

    /// Failure that still carries a placeholder payload (paged fetches).
    pub fn failure_with(err: DbError, data: T) -> Self {
        Self {
            ok: false,
            data: Some(data),
            error: Some(err.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.ok
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match (self.ok, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error),
            _ => Err(ErrorInfo::from(DbError::Query(
                "operation returned no data".to_string(),
            ))),
        }
    }
}

impl<T> From<crate::core::Result<T>> for Outcome<T> {
    fn from(result: crate::core::Result<T>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err),
        }
    }
}

/// Which slice of a collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// Clamp to the page >= 1, page_size >= 1 invariants.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.max(1),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page.max(1) - 1) * self.page_size.max(1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u64, page_size: u64) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        Self {
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size),
        }
    }

    /// The zeroed shape paged fetches fall back to: page resets to 1.
    pub fn empty(page_size: u64) -> Self {
        Self {
            total: 0,
            page: 1,
            page_size: page_size.max(1),
            total_pages: 0,
        }
    }
}

/// One page of documents plus its pagination envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub documents: Vec<Document>,
    pub pagination: Pagination,
}

impl Page {
    pub fn new(documents: Vec<Document>, pagination: Pagination) -> Self {
        Self {
            documents,
            pagination,
        }
    }

    pub fn empty(page_size: u64) -> Self {
        Self {
            documents: Vec::new(),
            pagination: Pagination::empty(page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(Pagination::new(12, 2, 5).total_pages, 3);
        assert_eq!(Pagination::new(10, 1, 10).total_pages, 1);
        assert_eq!(Pagination::new(11, 1, 10).total_pages, 2);
        assert_eq!(Pagination::new(1, 1, 10).total_pages, 1);
    }

    #[test]
    fn test_total_pages_zero_when_empty() {
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
        assert_eq!(Pagination::empty(10).total_pages, 0);
        assert_eq!(Pagination::empty(10).page, 1);
    }

    #[test]
    fn test_page_and_size_are_clamped() {
        let pagination = Pagination::new(5, 0, 0);
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.page_size, 1);
    }

    #[test]
    fn test_skip_computation() {
        assert_eq!(PageRequest::new(1, 10).skip(), 0);
        assert_eq!(PageRequest::new(2, 5).skip(), 5);
        assert_eq!(PageRequest::new(4, 25).skip(), 75);
    }

    #[test]
    fn test_default_request() {
        let request = PageRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 10);
    }

    #[test]
    fn test_outcome_success_shape() {
        let outcome = Outcome::success(7);
        assert!(outcome.is_success());
        assert_eq!(outcome.data(), Some(&7));
        assert!(outcome.error().is_none());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"], 7);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_outcome_failure_shape() {
        let outcome: Outcome<u64> = Outcome::failure(DbError::Query("boom".into()));
        assert!(!outcome.is_success());
        assert!(outcome.data().is_none());
        assert_eq!(outcome.error().unwrap().kind, ErrorKind::Query);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["kind"], "query");
    }

    #[test]
    fn test_failure_with_placeholder_payload() {
        let outcome = Outcome::failure_with(DbError::Timeout("slow".into()), Page::empty(10));
        assert!(!outcome.is_success());
        assert_eq!(outcome.data().unwrap().pagination, Pagination::empty(10));
        assert_eq!(outcome.error().unwrap().kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Outcome::success(1).into_result(), Ok(1));
        let err: Result<u64, _> = Outcome::failure(DbError::Query("x".into())).into_result();
        assert_eq!(err.unwrap_err().kind, ErrorKind::Query);
    }
}
