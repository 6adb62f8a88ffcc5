//! Repositories with a tag-invalidated cache decorator.
//!
//! - [`storage::DirectRepository`] translates the `Repository` contract to a
//!   `Persistence` backend (`inmemory` or `sqlite`).
//! - [`storage::CachedRepository`] wraps any repository with remember
//!   semantics over a `TaggedCache` backend (`memory` or `redis`).
//! - [`registry::RegistryBuilder`] binds contracts to implementations from
//!   [`config::Config`].

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!("Must enable at least one persistence feature: 'inmemory' or 'sqlite'");

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!("Must enable at least one cache feature: 'memory' or 'redis'");

pub mod cache;
pub mod config;
mod delegate;
pub mod registry;
pub mod storage;

#[cfg(all(test, feature = "inmemory"))]
pub(crate) mod fixtures;

pub use config::Config;
pub use registry::{RegistryBuilder, RepositoryRegistry, Wiring};
pub use repocache_core::storage::Repository;
pub use storage::{CachedRepository, DirectRepository};

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use repocache_core::entity::EntityId;
    pub use repocache_core::query::{
        Attributes, Columns, DeleteTarget, Page, PageRequest, SortOrder, UpdateTarget,
    };
    pub use repocache_core::storage::{QueryBuilder, Repository, Result};
}
