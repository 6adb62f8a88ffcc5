//! Cache decorator for any `Repository` implementation.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use repocache_core::cache::serialization::{deserialize, serialize_cacheable};
use repocache_core::cache::{repository_tags, CacheError, CacheKey, TaggedCache};
use repocache_core::entity::{Entity, EntityId};
use repocache_core::query::{
    Attributes, Columns, DeleteTarget, Page, PageRequest, SortOrder, UpdateTarget,
};
use repocache_core::storage::{QueryBuilder, Repository, Result};

/// Cached repository decorator.
///
/// Implements remember semantics over a tagged cache:
/// - **Reads**: look up a deterministic key under `[entity, "global"]`; on a
///   miss call the wrapped repository and store the result with the TTL
/// - **Writes**: delegate, then flush the `entity` tag once the write succeeds
///
/// Keys start with the active locale, so the same read under two locales is
/// cached twice. Use [`CachedRepository::with_locale`] for per-request locales.
///
/// # Type Parameters
///
/// * `E` - The entity type
/// * `R` - The wrapped repository, usually `dyn Repository<E>`
pub struct CachedRepository<E, R: ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn TaggedCache>,
    locale: String,
    ttl: Duration,
    tags: Vec<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R: ?Sized> Clone for CachedRepository<E, R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            locale: self.locale.clone(),
            ttl: self.ttl,
            tags: self.tags.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E, R> CachedRepository<E, R>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    /// Creates a cached repository.
    ///
    /// # Arguments
    ///
    /// * `repository` - The repository to decorate
    /// * `cache` - The tagged cache backend
    /// * `locale` - Locale prefixed to every key
    /// * `ttl` - Time-to-live for cached reads
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn TaggedCache>,
        locale: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            locale: locale.into(),
            ttl,
            tags: repository_tags(E::NAME),
            _entity: PhantomData,
        }
    }

    /// Returns a copy scoped to another locale, sharing the same backends.
    pub fn with_locale(&self, locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..self.clone()
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn key(&self, operation: &'static str) -> CacheKey {
        CacheKey::new(self.locale.as_str(), E::NAME, operation)
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// result. Values that serialize to `null` are returned but not stored.
    async fn remember<T, F>(&self, key: CacheKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: Future<Output = Result<T>> + Send,
    {
        let key = key.to_string();

        if let Some(bytes) = self.cache.get(&self.tags, &key).await? {
            match deserialize::<T>(&bytes) {
                Ok(value) => {
                    tracing::trace!(entity = E::NAME, key = %key, "Cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!(
                        entity = E::NAME,
                        key = %key,
                        error = %err,
                        "Cached value could not be deserialized"
                    );
                }
            }
        }

        tracing::trace!(entity = E::NAME, key = %key, "Cache miss");
        let value = fetch.await?;

        if let Some(bytes) = serialize_cacheable(&value).map_err(CacheError::from)? {
            self.cache
                .put(&self.tags, &key, &bytes, Some(self.ttl))
                .await?;
        }

        Ok(value)
    }

    /// Flushes every cached read of the entity.
    async fn invalidate(&self) -> Result<()> {
        self.cache.flush(&[E::NAME.to_string()]).await?;
        tracing::debug!(entity = E::NAME, "Invalidated cached reads");
        Ok(())
    }
}

#[async_trait]
impl<E, R> Repository<E> for CachedRepository<E, R>
where
    E: Entity,
    R: Repository<E> + ?Sized + 'static,
{
    fn query_builder(&self) -> QueryBuilder<E> {
        self.repository.query_builder()
    }

    async fn all(&self, columns: Columns) -> Result<Vec<E>> {
        let key = self.key("all").arg(columns.to_value());
        self.remember(key, self.repository.all(columns)).await
    }

    async fn find(&self, id: EntityId, columns: Columns) -> Result<Option<E>> {
        let key = self.key("find").arg(id).arg(columns.to_value());
        self.remember(key, self.repository.find(id, columns)).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>> {
        let key = self.key("findBySlug").arg(slug);
        self.remember(key, self.repository.find_by_slug(slug)).await
    }

    async fn first_by_attributes(&self, attributes: &Attributes) -> Result<Option<E>> {
        let key = self.key("firstByAttributes").arg(attributes.to_value());
        self.remember(key, self.repository.first_by_attributes(attributes))
            .await
    }

    async fn all_by_attributes(
        &self,
        attributes: &Attributes,
        order_by: Option<&str>,
        sort_order: SortOrder,
    ) -> Result<Vec<E>> {
        let key = self
            .key("allByAttributes")
            .arg(attributes.to_value())
            .arg(order_by)
            .arg(sort_order.as_str());
        self.remember(
            key,
            self.repository
                .all_by_attributes(attributes, order_by, sort_order),
        )
        .await
    }

    fn with(&self, relations: &[&str]) -> QueryBuilder<E> {
        self.repository.with(relations)
    }

    fn without(&self, relations: &[&str]) -> QueryBuilder<E> {
        self.repository.without(relations)
    }

    async fn has(&self, relation: &str) -> Result<Vec<E>> {
        let key = self.key("has").arg(relation);
        self.remember(key, self.repository.has(relation)).await
    }

    async fn paginate(&self, request: PageRequest) -> Result<Page<E>> {
        let key = self
            .key("paginate")
            .arg(request.per_page)
            .arg(request.order_by.clone())
            .arg(request.order_dir.as_str())
            .arg(request.columns.to_value())
            .arg(request.page_name.clone())
            .arg(request.current_page());
        self.remember(key, self.repository.paginate(request)).await
    }

    async fn create(&self, attributes: Attributes) -> Result<E> {
        let created = self.repository.create(attributes).await?;
        self.invalidate().await?;
        Ok(created)
    }

    async fn update(&self, target: UpdateTarget<E>, attributes: Attributes) -> Result<bool> {
        let updated = self.repository.update(target, attributes).await?;
        self.invalidate().await?;
        Ok(updated)
    }

    async fn delete(&self, target: DeleteTarget<E>) -> Result<usize> {
        let removed = self.repository.delete(target).await?;
        self.invalidate().await?;
        Ok(removed)
    }

    async fn delete_by_id(&self, id: EntityId) -> Result<usize> {
        let removed = self.repository.delete_by_id(id).await?;
        self.invalidate().await?;
        Ok(removed)
    }

    async fn force_delete(&self, entity: &E) -> Result<bool> {
        let deleted = self.repository.force_delete(entity).await?;
        self.invalidate().await?;
        Ok(deleted)
    }

    async fn clear_cache(&self) -> Result<bool> {
        self.invalidate().await?;
        Ok(true)
    }

    fn new_entity_instance(&self, attributes: Attributes) -> Result<E> {
        self.repository.new_entity_instance(attributes)
    }

    async fn truncate(&self) -> Result<()> {
        self.repository.truncate().await?;
        self.invalidate().await
    }
}
