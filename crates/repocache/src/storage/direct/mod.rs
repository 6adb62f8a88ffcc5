//! Repositories backed directly by a `Persistence` implementation.

mod repository;

pub use repository::DirectRepository;
