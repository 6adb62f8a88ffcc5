//! In-memory persistence backend.
//!
//! Stores every entity's rows in ordered maps wrapped in `Arc<RwLock<_>>`.
//! Useful for tests and development where durability is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use repocache::storage::inmemory::InMemoryPersistence;
//!
//! let persistence = Arc::new(InMemoryPersistence::new());
//! let posts = DirectRepository::<Post>::new(persistence);
//! ```

mod persistence;

pub use persistence::InMemoryPersistence;
