mod pagination;
mod targets;
mod types;

pub use pagination::{Page, PageRequest, DEFAULT_PAGE_NAME, DEFAULT_PER_PAGE};
pub use targets::{DeleteTarget, UpdateTarget};
pub use types::{Attributes, Columns, OrderBy, Query, SortOrder};
