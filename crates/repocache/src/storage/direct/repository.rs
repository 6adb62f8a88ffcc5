//! Repository that translates every operation straight to persistence.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use repocache_core::entity::{from_record, Entity, EntityId, EntitySchema};
use repocache_core::query::{
    Attributes, Columns, DeleteTarget, Page, PageRequest, Query, SortOrder, UpdateTarget,
};
use repocache_core::storage::{Persistence, QueryBuilder, Repository, RepositoryError, Result};

/// Direct repository for entity `E`.
///
/// Holds no state beyond its persistence handle; cloning is cheap.
pub struct DirectRepository<E> {
    persistence: Arc<dyn Persistence>,
    schema: EntitySchema,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for DirectRepository<E> {
    fn clone(&self) -> Self {
        Self {
            persistence: Arc::clone(&self.persistence),
            schema: self.schema.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> DirectRepository<E> {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self {
            persistence,
            schema: E::schema(),
            _entity: PhantomData,
        }
    }

    fn persisted_id(entity: &E) -> Result<EntityId> {
        entity
            .id()
            .ok_or(RepositoryError::NotPersisted {
                entity_type: E::NAME,
            })
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for DirectRepository<E> {
    fn query_builder(&self) -> QueryBuilder<E> {
        QueryBuilder::new(Arc::clone(&self.persistence))
    }

    async fn all(&self, columns: Columns) -> Result<Vec<E>> {
        tracing::trace!(entity = E::NAME, "all");
        self.query_builder().columns(columns).get().await
    }

    async fn find(&self, id: EntityId, columns: Columns) -> Result<Option<E>> {
        tracing::trace!(entity = E::NAME, id, "find");
        let with = Query::for_schema(&self.schema).with;
        self.persistence
            .find(&self.schema, id, &columns, &with)
            .await?
            .map(from_record)
            .transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>> {
        tracing::trace!(entity = E::NAME, slug, "find_by_slug");
        self.first_by_attributes(&Attributes::from([("slug", slug)]))
            .await
    }

    async fn first_by_attributes(&self, attributes: &Attributes) -> Result<Option<E>> {
        tracing::trace!(entity = E::NAME, attributes = attributes.len(), "first_by_attributes");
        self.query_builder()
            .where_attributes(attributes)
            .first()
            .await
    }

    async fn all_by_attributes(
        &self,
        attributes: &Attributes,
        order_by: Option<&str>,
        sort_order: SortOrder,
    ) -> Result<Vec<E>> {
        tracing::trace!(entity = E::NAME, ?order_by, %sort_order, "all_by_attributes");
        let mut builder = self.query_builder().where_attributes(attributes);
        if let Some(column) = order_by {
            builder = builder.order_by(column, sort_order);
        }
        builder.get().await
    }

    fn with(&self, relations: &[&str]) -> QueryBuilder<E> {
        self.query_builder().with(relations)
    }

    fn without(&self, relations: &[&str]) -> QueryBuilder<E> {
        self.query_builder().without(relations)
    }

    async fn has(&self, relation: &str) -> Result<Vec<E>> {
        tracing::trace!(entity = E::NAME, relation, "has");
        self.query_builder().has(relation).get().await
    }

    async fn paginate(&self, request: PageRequest) -> Result<Page<E>> {
        tracing::trace!(
            entity = E::NAME,
            per_page = request.per_page,
            page = request.current_page(),
            "paginate"
        );
        self.query_builder().paginate(&request).await
    }

    async fn create(&self, attributes: Attributes) -> Result<E> {
        tracing::trace!(entity = E::NAME, "create");
        let record = self
            .persistence
            .insert(&self.schema, attributes.into_record())
            .await?;
        from_record(record)
    }

    async fn update(&self, target: UpdateTarget<E>, attributes: Attributes) -> Result<bool> {
        let id = match target {
            UpdateTarget::Entity(entity) => match entity.id() {
                Some(id) => id,
                None => return Ok(false),
            },
            UpdateTarget::Id(id) => id,
        };
        tracing::trace!(entity = E::NAME, id, "update");
        self.persistence
            .update(&self.schema, id, attributes.into_record())
            .await
    }

    async fn delete(&self, target: DeleteTarget<E>) -> Result<usize> {
        match target {
            DeleteTarget::Entity(entity) => {
                let id = Self::persisted_id(&entity)?;
                tracing::trace!(entity = E::NAME, id, "delete instance");
                self.persistence.delete(&self.schema, id).await?;
                Ok(1)
            }
            DeleteTarget::Id(id) => {
                tracing::trace!(entity = E::NAME, id, "delete by identifier");
                self.persistence.destroy(&self.schema, &[id]).await
            }
            DeleteTarget::Ids(ids) => {
                tracing::trace!(entity = E::NAME, count = ids.len(), "delete by identifiers");
                self.persistence.destroy(&self.schema, &ids).await
            }
        }
    }

    async fn delete_by_id(&self, id: EntityId) -> Result<usize> {
        self.delete(DeleteTarget::Id(id)).await
    }

    async fn force_delete(&self, entity: &E) -> Result<bool> {
        let id = Self::persisted_id(entity)?;
        tracing::trace!(entity = E::NAME, id, "force_delete");
        self.persistence.force_delete(&self.schema, id).await?;
        Ok(true)
    }

    async fn clear_cache(&self) -> Result<bool> {
        Ok(true)
    }

    fn new_entity_instance(&self, attributes: Attributes) -> Result<E> {
        from_record(attributes.into_record())
    }

    async fn truncate(&self) -> Result<()> {
        tracing::trace!(entity = E::NAME, "truncate");
        self.persistence.truncate(&self.schema).await
    }
}
