mod error;
mod query_builder;
pub mod records;
mod traits;

pub use error::{RepositoryError, Result};
pub use query_builder::QueryBuilder;
pub use traits::{Persistence, Repository};
