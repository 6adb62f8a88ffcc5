//! Repository registry.
//!
//! Binds repository contracts to implementations at startup. A contract is
//! any `?Sized` type, usually `dyn Repository<E>` or a generated
//! `dyn PostRepository`; its implementation is built once from a [`Wiring`]
//! and resolved by type afterwards.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use repocache_core::cache::TaggedCache;
use repocache_core::entity::Entity;
use repocache_core::storage::{Persistence, Repository, Result};

use crate::config::Config;
use crate::storage::{CachedRepository, DirectRepository};

/// Everything a contract factory needs to build an implementation of `E`.
pub struct Wiring<'a, E> {
    persistence: &'a Arc<dyn Persistence>,
    cache: &'a Arc<dyn TaggedCache>,
    config: &'a Config,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Wiring<'_, E> {
    /// Direct repository over the registry's persistence.
    pub fn direct(&self) -> DirectRepository<E> {
        DirectRepository::new(Arc::clone(self.persistence))
    }

    /// Wraps `inner` in the cache decorator using the configured locale and TTL.
    pub fn cached<R>(&self, inner: Arc<R>) -> CachedRepository<E, R>
    where
        R: Repository<E> + ?Sized,
    {
        CachedRepository::new(
            inner,
            Arc::clone(self.cache),
            self.config.locale.clone(),
            self.config.cache_ttl(),
        )
    }

    pub fn cache_enabled(&self) -> bool {
        self.config.cache_enabled
    }

    pub fn persistence(&self) -> Arc<dyn Persistence> {
        Arc::clone(self.persistence)
    }

    pub fn cache(&self) -> Arc<dyn TaggedCache> {
        Arc::clone(self.cache)
    }

    pub fn config(&self) -> &Config {
        self.config
    }
}

struct Binding {
    contract: &'static str,
    /// Always an `Arc<C>` for the contract `C` the binding is keyed by.
    instance: Box<dyn Any + Send + Sync>,
}

/// Collects bindings, then freezes them into a [`RepositoryRegistry`].
///
/// # Example
///
/// ```ignore
/// let registry = RegistryBuilder::from_config(Config::from_env())
///     .await?
///     .bind::<Post>()
///     .build();
///
/// let posts = registry.repository::<Post>().expect("posts are bound");
/// ```
pub struct RegistryBuilder {
    persistence: Arc<dyn Persistence>,
    cache: Arc<dyn TaggedCache>,
    config: Config,
    bindings: HashMap<TypeId, Binding>,
}

impl RegistryBuilder {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        cache: Arc<dyn TaggedCache>,
        config: Config,
    ) -> Self {
        Self {
            persistence,
            cache,
            config,
            bindings: HashMap::new(),
        }
    }

    /// Creates a builder with the backends selected by the enabled features.
    ///
    /// SQLite is preferred over the in-memory store and Redis over the
    /// in-memory cache when both are compiled in.
    pub async fn from_config(config: Config) -> Result<Self> {
        let persistence = backends::persistence(&config).await?;
        let cache = backends::cache(&config).await?;
        tracing::info!(
            cache_enabled = config.cache_enabled,
            ttl_minutes = config.cache_time_minutes,
            locale = %config.locale,
            "Repository registry configured"
        );
        Ok(Self::new(persistence, cache, config))
    }

    /// Binds `dyn Repository<E>` to a direct repository, wrapped in the cache
    /// decorator when caching is enabled.
    pub fn bind<E: Entity>(self) -> Self {
        self.bind_contract::<dyn Repository<E>, E, _>(|wiring| {
            let direct: Arc<dyn Repository<E>> = Arc::new(wiring.direct());
            let repository: Arc<dyn Repository<E>> = if wiring.cache_enabled() {
                Arc::new(wiring.cached(direct))
            } else {
                direct
            };
            repository
        })
    }

    /// Binds contract `C` to the implementation built by `factory`.
    ///
    /// Binding a contract twice keeps the last implementation.
    pub fn bind_contract<C, E, F>(mut self, factory: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        E: Entity,
        F: FnOnce(&Wiring<'_, E>) -> Arc<C>,
    {
        let wiring = Wiring {
            persistence: &self.persistence,
            cache: &self.cache,
            config: &self.config,
            _entity: PhantomData,
        };
        let instance = factory(&wiring);

        let contract = type_name::<C>();
        let previous = self.bindings.insert(
            TypeId::of::<C>(),
            Binding {
                contract,
                instance: Box::new(instance),
            },
        );
        if previous.is_some() {
            tracing::warn!(
                contract,
                entity = E::NAME,
                "Contract bound twice, keeping the last binding"
            );
        } else {
            tracing::debug!(contract, entity = E::NAME, "Contract bound");
        }
        self
    }

    pub fn build(self) -> RepositoryRegistry {
        RepositoryRegistry {
            bindings: self.bindings,
        }
    }
}

/// Resolved contract bindings.
pub struct RepositoryRegistry {
    bindings: HashMap<TypeId, Binding>,
}

impl RepositoryRegistry {
    /// Returns the implementation bound to contract `C`.
    pub fn resolve<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.bindings
            .get(&TypeId::of::<C>())
            .and_then(|binding| binding.instance.downcast_ref::<Arc<C>>())
            .cloned()
    }

    /// Shorthand for `resolve::<dyn Repository<E>>()`.
    pub fn repository<E: Entity>(&self) -> Option<Arc<dyn Repository<E>>> {
        self.resolve::<dyn Repository<E>>()
    }

    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<C>())
    }

    /// Names of the bound contracts, sorted.
    pub fn contracts(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.bindings.values().map(|b| b.contract).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

mod backends {
    use super::*;

    #[cfg(feature = "sqlite")]
    pub async fn persistence(config: &Config) -> Result<Arc<dyn Persistence>> {
        tracing::debug!(path = %config.sqlite_path, "Using SQLite persistence");
        let persistence = crate::storage::SqlitePersistence::new(&config.sqlite_path).await?;
        Ok(Arc::new(persistence))
    }

    #[cfg(all(feature = "inmemory", not(feature = "sqlite")))]
    pub async fn persistence(_config: &Config) -> Result<Arc<dyn Persistence>> {
        tracing::debug!("Using in-memory persistence");
        Ok(Arc::new(crate::storage::InMemoryPersistence::new()))
    }

    #[cfg(feature = "redis")]
    pub async fn cache(config: &Config) -> Result<Arc<dyn TaggedCache>> {
        tracing::debug!(url = %config.redis_url, "Using Redis cache");
        let cache = crate::cache::RedisCache::new(&config.redis_url).await?;
        Ok(Arc::new(cache))
    }

    #[cfg(all(feature = "memory", not(feature = "redis")))]
    pub async fn cache(config: &Config) -> Result<Arc<dyn TaggedCache>> {
        tracing::debug!(max_entries = config.cache_max_entries, "Using memory cache");
        Ok(Arc::new(crate::cache::MemoryCache::new(config.cache_max_entries)))
    }
}
