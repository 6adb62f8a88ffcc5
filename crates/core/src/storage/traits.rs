use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::entity::{Entity, EntityId, EntitySchema, Record};
use crate::query::{
    Attributes, Columns, DeleteTarget, Page, PageRequest, Query, SortOrder, UpdateTarget,
};

use super::{QueryBuilder, Result};

/// Data-access contract for one entity type.
///
/// Implemented by the direct repository, which talks to persistence, and by
/// the cache decorator, which wraps another implementation. Callers hold an
/// `Arc<dyn Repository<E>>` and cannot tell the two apart.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Returns a fresh query handle with the entity's default eager loads.
    fn query_builder(&self) -> QueryBuilder<E>;

    /// Gets every live entity.
    async fn all(&self, columns: Columns) -> Result<Vec<E>>;

    /// Gets an entity by its primary key.
    async fn find(&self, id: EntityId, columns: Columns) -> Result<Option<E>>;

    /// Gets the entity whose `slug` attribute equals `slug`.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>>;

    /// Gets the first entity matching every attribute.
    async fn first_by_attributes(&self, attributes: &Attributes) -> Result<Option<E>>;

    /// Gets every entity matching every attribute, optionally ordered.
    async fn all_by_attributes(
        &self,
        attributes: &Attributes,
        order_by: Option<&str>,
        sort_order: SortOrder,
    ) -> Result<Vec<E>>;

    /// Returns a query handle with additional relations eager-loaded.
    fn with(&self, relations: &[&str]) -> QueryBuilder<E>;

    /// Returns a query handle with the given relations removed from the
    /// eager-load set.
    fn without(&self, relations: &[&str]) -> QueryBuilder<E>;

    /// Gets every entity that has at least one row through `relation`, with
    /// that relation loaded.
    async fn has(&self, relation: &str) -> Result<Vec<E>>;

    /// Gets one page of entities.
    async fn paginate(&self, request: PageRequest) -> Result<Page<E>>;

    /// Persists a new entity.
    async fn create(&self, attributes: Attributes) -> Result<E>;

    /// Merges `attributes` into an existing entity.
    ///
    /// Returns `false` when nothing was updated.
    async fn update(&self, target: UpdateTarget<E>, attributes: Attributes) -> Result<bool>;

    /// Deletes an entity or a batch of identifiers, returning the number of
    /// rows removed.
    async fn delete(&self, target: DeleteTarget<E>) -> Result<usize>;

    /// Deletes by primary key.
    async fn delete_by_id(&self, id: EntityId) -> Result<usize>;

    /// Removes the entity permanently, bypassing soft deletion.
    async fn force_delete(&self, entity: &E) -> Result<bool>;

    /// Invalidates every cached read of this entity.
    async fn clear_cache(&self) -> Result<bool>;

    /// Builds an unsaved entity from attributes.
    fn new_entity_instance(&self, attributes: Attributes) -> Result<E>;

    /// Removes every row of the entity.
    async fn truncate(&self) -> Result<()>;
}

/// Storage collaborator the direct repository translates to.
///
/// Works on untyped records so that one backend serves every entity.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Gets the records matching `query`.
    async fn fetch(&self, schema: &EntitySchema, query: &Query) -> Result<Vec<Record>>;

    /// Counts the records matching `query`, ignoring its window.
    async fn count(&self, schema: &EntitySchema, query: &Query) -> Result<u64>;

    /// Gets a live record by primary key.
    async fn find(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        columns: &Columns,
        with: &BTreeSet<String>,
    ) -> Result<Option<Record>>;

    /// Inserts a record and returns it with its assigned `id`.
    async fn insert(&self, schema: &EntitySchema, record: Record) -> Result<Record>;

    /// Merges `changes` into a live record. Returns `false` if none matched.
    async fn update(&self, schema: &EntitySchema, id: EntityId, changes: Record) -> Result<bool>;

    /// Deletes one live record, softly when the schema uses soft deletes.
    ///
    /// Fails with `NotFound` when no live record has this id.
    async fn delete(&self, schema: &EntitySchema, id: EntityId) -> Result<()>;

    /// Deletes a batch of live records and returns how many were removed.
    /// Missing identifiers are skipped.
    async fn destroy(&self, schema: &EntitySchema, ids: &[EntityId]) -> Result<usize>;

    /// Removes a record permanently, trashed or not.
    async fn force_delete(&self, schema: &EntitySchema, id: EntityId) -> Result<()>;

    /// Removes every record of the entity.
    async fn truncate(&self, schema: &EntitySchema) -> Result<()>;
}
