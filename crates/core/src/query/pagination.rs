use serde::{Deserialize, Serialize};

use crate::storage::{RepositoryError, Result};

use super::{Columns, SortOrder};

/// Default number of items per page.
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Default query-string parameter carrying the page number.
pub const DEFAULT_PAGE_NAME: &str = "page";

/// Largest row offset or page size a request may produce.
const MAX_WINDOW: u64 = i64::MAX as u64;

/// Parameters of a `paginate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub per_page: u64,
    /// Ordering is applied only when a column is given.
    pub order_by: Option<String>,
    pub order_dir: SortOrder,
    pub columns: Columns,
    pub page_name: String,
    /// Requested page, starting at 1. `None` means the first page.
    pub page: Option<u64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            order_by: None,
            order_dir: SortOrder::Asc,
            columns: Columns::All,
            page_name: DEFAULT_PAGE_NAME.to_string(),
            page: None,
        }
    }
}

impl PageRequest {
    /// Creates a request for `per_page` items on the first page.
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortOrder) -> Self {
        self.order_by = Some(column.into());
        self.order_dir = direction;
        self
    }

    pub fn columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    pub fn page_name(mut self, page_name: impl Into<String>) -> Self {
        self.page_name = page_name.into();
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// The page that will be returned.
    pub fn current_page(&self) -> u64 {
        self.page.unwrap_or(1)
    }

    /// Number of rows skipped before the window, saturating at `u64::MAX`.
    pub fn offset(&self) -> u64 {
        self.checked_offset().unwrap_or(u64::MAX)
    }

    fn checked_offset(&self) -> Option<u64> {
        self.current_page().saturating_sub(1).checked_mul(self.per_page)
    }

    /// Rejects empty pages, page zero and windows that do not fit a signed
    /// 64-bit row offset.
    pub fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(RepositoryError::InvalidData(
                "per_page must be greater than zero".to_string(),
            ));
        }
        if self.page == Some(0) {
            return Err(RepositoryError::InvalidData(
                "page numbers start at 1".to_string(),
            ));
        }
        let in_range = |n: u64| n <= MAX_WINDOW;
        if !in_range(self.per_page) || !self.checked_offset().is_some_and(in_range) {
            return Err(RepositoryError::InvalidData(format!(
                "page {} of {} items is out of range",
                self.current_page(),
                self.per_page
            )));
        }
        Ok(())
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub page_name: String,
}

impl<T> Page<T> {
    /// Builds a page, deriving `last_page` from the total.
    pub fn new(
        items: Vec<T>,
        total: u64,
        per_page: u64,
        current_page: u64,
        page_name: impl Into<String>,
    ) -> Self {
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };
        Self {
            items,
            total,
            per_page,
            current_page,
            last_page,
            page_name: page_name.into(),
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// URL of `page` relative to `base`, using the configured page parameter.
    pub fn url_for(&self, base: &str, page: u64) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}{}={page}", self.page_name)
    }

    /// Converts the items while keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
            last_page: self.last_page,
            page_name: self.page_name,
        }
    }
}
