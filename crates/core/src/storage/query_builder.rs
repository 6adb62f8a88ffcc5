use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::entity::{from_records, Entity, EntitySchema};
use crate::query::{Attributes, Columns, Page, PageRequest, Query, SortOrder};

use super::records::validate_query;
use super::{Persistence, Result};

/// Chainable query over one entity type.
///
/// Builder methods consume and return the handle; `get`, `first`, `count`
/// and `paginate` run it against persistence. Results are never cached.
pub struct QueryBuilder<E> {
    persistence: Arc<dyn Persistence>,
    schema: EntitySchema,
    query: Query,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            persistence: Arc::clone(&self.persistence),
            schema: self.schema.clone(),
            query: self.query.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> QueryBuilder<E> {
    /// Creates a query preloaded with the entity's eager relations.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        let schema = E::schema();
        let query = Query::for_schema(&schema);
        Self {
            persistence,
            schema,
            query,
            _entity: PhantomData,
        }
    }

    /// The query as it currently stands.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn with(mut self, relations: &[&str]) -> Self {
        self.query = self.query.with(relations.iter().copied());
        self
    }

    pub fn without(mut self, relations: &[&str]) -> Self {
        self.query = self.query.without(relations.iter().copied());
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query = self.query.filter(column, value);
        self
    }

    pub fn where_attributes(mut self, attributes: &Attributes) -> Self {
        self.query = self.query.filters(attributes);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortOrder) -> Self {
        self.query = self.query.order_by(column, direction);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    pub fn columns(mut self, columns: Columns) -> Self {
        self.query = self.query.columns(columns);
        self
    }

    /// Keeps rows with at least one related row, loading that relation.
    pub fn has(mut self, relation: &str) -> Self {
        self.query = self.query.has(relation).with([relation]);
        self
    }

    pub fn with_trashed(mut self) -> Self {
        self.query = self.query.with_trashed();
        self
    }

    /// Runs the query.
    pub async fn get(self) -> Result<Vec<E>> {
        validate_query(&self.schema, &self.query)?;
        let records = self.persistence.fetch(&self.schema, &self.query).await?;
        from_records(records)
    }

    /// Runs the query with a limit of one.
    pub async fn first(self) -> Result<Option<E>> {
        let mut items = self.limit(1).get().await?;
        Ok(items.pop())
    }

    /// Counts matching rows, ignoring limit and offset.
    pub async fn count(self) -> Result<u64> {
        validate_query(&self.schema, &self.query)?;
        self.persistence
            .count(&self.schema, &self.query.unwindowed())
            .await
    }

    /// Counts matching rows, then fetches the requested window.
    ///
    /// Ordering is applied only when the request names a column.
    pub async fn paginate(self, request: &PageRequest) -> Result<Page<E>> {
        request.validate()?;

        let mut builder = self.columns(request.columns.clone());
        if let Some(column) = &request.order_by {
            builder = builder.order_by(column.clone(), request.order_dir);
        }

        let total = builder.clone().count().await?;
        let items = builder
            .offset(request.offset())
            .limit(request.per_page)
            .get()
            .await?;

        Ok(Page::new(
            items,
            total,
            request.per_page,
            request.current_page(),
            request.page_name.clone(),
        ))
    }
}
