//! SQLite storage backend.
//!
//! Uses `rusqlite` for the statements and `tokio-rusqlite` to run them off
//! the async runtime.

mod conversions;
mod error;
mod persistence;
mod schema;

pub use persistence::SqlitePersistence;
