//! Tagged cache backends.
//!
//! Concrete implementations of `repocache_core::cache::TaggedCache`, selected
//! via feature flags:
//!
//! - `memory` (default): in-memory LRU cache
//! - `redis`: Redis cache using the redis crate
//!
//! Both may be compiled in; the caller decides which one to hand to the
//! registry.

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

#[cfg(feature = "memory")]
pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
