//! Paged-list envelope and page request primitives shared by Bridge DAOs.
//!
//! Every paged read in the persistence layer returns a [`PagedResourceList`]:
//! one page of items, the total number of matching records, and the request
//! parameters that produced the page so callers can echo them back to
//! clients. [`PageRequest`] validates the offset and page size before a query
//! is assembled.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Smallest page size accepted by [`PageRequest::new`].
pub const API_MINIMUM_PAGE_SIZE: i64 = 5;
/// Largest page size accepted by [`PageRequest::new`].
pub const API_MAXIMUM_PAGE_SIZE: i64 = 100;
/// Page size used when a caller does not request one.
pub const API_DEFAULT_PAGE_SIZE: i64 = 50;

/// Request parameter key for the record offset.
pub const OFFSET_BY: &str = "offsetBy";
/// Request parameter key for the page size.
pub const PAGE_SIZE: &str = "pageSize";
/// Request parameter key for the include-deleted flag.
pub const INCLUDE_DELETED: &str = "includeDeleted";

/// Errors raised while validating a page request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The offset was below zero.
    #[error("offsetBy cannot be negative")]
    NegativeOffset,
    /// The page size fell outside the accepted bounds.
    #[error("pageSize must be from {min}-{max} records")]
    PageSize {
        /// Smallest accepted page size.
        min: i64,
        /// Largest accepted page size.
        max: i64,
    },
}

/// A validated offset and page size.
///
/// # Examples
///
/// ```
/// use pagination::{PageError, PageRequest};
///
/// let page = PageRequest::new(10, 25).expect("valid page");
/// assert_eq!(page.offset_by(), 10);
/// assert_eq!(page.page_size(), 25);
///
/// assert_eq!(PageRequest::new(-1, 25), Err(PageError::NegativeOffset));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    offset_by: u64,
    page_size: u64,
}

impl PageRequest {
    /// Validate the raw offset and page size.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::NegativeOffset`] for a negative offset and
    /// [`PageError::PageSize`] when the page size is outside
    /// [`API_MINIMUM_PAGE_SIZE`]..=[`API_MAXIMUM_PAGE_SIZE`].
    pub fn new(offset_by: i64, page_size: i64) -> Result<Self, PageError> {
        let offset_by = u64::try_from(offset_by).map_err(|_| PageError::NegativeOffset)?;
        if !(API_MINIMUM_PAGE_SIZE..=API_MAXIMUM_PAGE_SIZE).contains(&page_size) {
            return Err(PageError::PageSize {
                min: API_MINIMUM_PAGE_SIZE,
                max: API_MAXIMUM_PAGE_SIZE,
            });
        }
        let page_size = u64::try_from(page_size).map_err(|_| PageError::PageSize {
            min: API_MINIMUM_PAGE_SIZE,
            max: API_MAXIMUM_PAGE_SIZE,
        })?;
        Ok(Self {
            offset_by,
            page_size,
        })
    }

    /// Validate optional values, applying a zero offset and the default page
    /// size where a value is missing.
    ///
    /// # Errors
    ///
    /// Same as [`PageRequest::new`].
    pub fn from_optional(
        offset_by: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Self, PageError> {
        Self::new(
            offset_by.unwrap_or(0),
            page_size.unwrap_or(API_DEFAULT_PAGE_SIZE),
        )
    }

    /// Number of records to skip.
    #[must_use]
    pub const fn offset_by(&self) -> u64 {
        self.offset_by
    }

    /// Maximum number of records in the page.
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset_by: 0,
            page_size: API_DEFAULT_PAGE_SIZE.unsigned_abs(),
        }
    }
}

/// One page of results plus the total count and echoed request parameters.
///
/// Serializes with Bridge's camelCase layout and a `type` discriminator:
///
/// ```
/// use pagination::PagedResourceList;
///
/// let page = PagedResourceList::new(vec!["a", "b"], 7).with_request_param("pageSize", 5);
/// let json = serde_json::to_value(&page).expect("serializable");
/// assert_eq!(json["total"], 7);
/// assert_eq!(json["requestParams"]["pageSize"], 5);
/// assert_eq!(json["type"], "PagedResourceList");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResourceList<T> {
    items: Vec<T>,
    total: u64,
    request_params: BTreeMap<String, Value>,
    #[serde(rename = "type")]
    resource_type: &'static str,
}

impl<T> PagedResourceList<T> {
    /// Wrap a page of items and the total number of matching records.
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64) -> Self {
        Self {
            items,
            total,
            request_params: BTreeMap::new(),
            resource_type: "PagedResourceList",
        }
    }

    /// Record a request parameter. Values that serialize to `null` are
    /// omitted so absent filters do not appear in the envelope.
    #[must_use]
    pub fn with_request_param(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::Null) | Err(_) => {}
            Ok(json) => {
                self.request_params.insert(key.to_owned(), json);
            }
        }
        self
    }

    /// Record the offset and page size of a validated request.
    #[must_use]
    pub fn with_page(self, page: PageRequest) -> Self {
        self.with_request_param(OFFSET_BY, page.offset_by())
            .with_request_param(PAGE_SIZE, page.page_size())
    }

    /// Items in this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the envelope and return its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Total number of records matching the query.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Echoed request parameters.
    #[must_use]
    pub const fn request_params(&self) -> &BTreeMap<String, Value> {
        &self.request_params
    }

    /// Transform every item while keeping the total and request parameters.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResourceList<U> {
        PagedResourceList {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request_params: self.request_params,
            resource_type: self.resource_type,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for page validation and the list envelope.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 5)]
    #[case(20, 50)]
    #[case(100, 100)]
    fn accepts_page_sizes_within_bounds(#[case] offset: i64, #[case] size: i64) {
        let page = PageRequest::new(offset, size).expect("valid page");
        assert_eq!(page.page_size(), u64::try_from(size).expect("positive"));
    }

    #[rstest]
    #[case(4)]
    #[case(101)]
    #[case(-5)]
    fn rejects_page_sizes_outside_bounds(#[case] size: i64) {
        let err = PageRequest::new(0, size).expect_err("size should be rejected");
        assert_eq!(err.to_string(), "pageSize must be from 5-100 records");
    }

    #[rstest]
    fn rejects_negative_offsets() {
        assert_eq!(PageRequest::new(-1, 10), Err(PageError::NegativeOffset));
    }

    #[rstest]
    fn missing_values_use_defaults() {
        let page = PageRequest::from_optional(None, None).expect("defaults are valid");
        assert_eq!(page.offset_by(), 0);
        assert_eq!(page.page_size(), 50);
    }

    #[rstest]
    fn null_request_params_are_omitted() {
        let page = PagedResourceList::new(Vec::<u8>::new(), 0)
            .with_request_param("emailFilter", None::<String>)
            .with_request_param(INCLUDE_DELETED, true);
        assert!(!page.request_params().contains_key("emailFilter"));
        assert_eq!(page.request_params()[INCLUDE_DELETED], Value::Bool(true));
    }

    #[rstest]
    fn map_preserves_total_and_params() {
        let page = PagedResourceList::new(vec![1, 2, 3], 30)
            .with_page(PageRequest::new(0, 5).expect("valid page"))
            .map(|n| n * 10);
        assert_eq!(page.items(), &[10, 20, 30]);
        assert_eq!(page.total(), 30);
        assert_eq!(page.request_params()[PAGE_SIZE], 5);
    }
}
