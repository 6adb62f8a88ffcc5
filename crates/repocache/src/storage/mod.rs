//! Repository implementations and persistence backends.
//!
//! `direct` and `cached` implement `repocache_core::storage::Repository`; the
//! backends implement `repocache_core::storage::Persistence` and are selected
//! via feature flags:
//!
//! - `inmemory` (default): in-memory tables, for tests and development
//! - `sqlite`: SQLite using `rusqlite` and `tokio-rusqlite`

pub mod cached;
pub mod direct;

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cached::CachedRepository;
pub use direct::DirectRepository;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryPersistence;

#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePersistence;

/// Timestamp written to `deleted_at` by soft deletes.
#[cfg(any(feature = "inmemory", feature = "sqlite"))]
pub(crate) fn deleted_at_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
