//! Cache decorator for repositories.
//!
//! Reads go through the cache first and populate it on a miss; writes are
//! delegated and then invalidate every cached read of the entity.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let persistence = Arc::new(InMemoryPersistence::new());
//! let direct: Arc<dyn Repository<Post>> = Arc::new(DirectRepository::new(persistence));
//! let cache = Arc::new(MemoryCache::new(10_000));
//!
//! let posts = CachedRepository::new(direct, cache, "en", Duration::from_secs(1800));
//! ```

mod repository;

pub use repository::CachedRepository;
