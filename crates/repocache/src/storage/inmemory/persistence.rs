//! In-memory persistence backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use repocache_core::entity::{EntityId, EntitySchema, Record, DELETED_AT_FIELD, ID_FIELD};
use repocache_core::query::{Columns, Query};
use repocache_core::storage::records::{
    attach_relation, has_related, is_trashed, matches_filters, project, resolve_relations,
    sort_records, validate_query, window, writable,
};
use repocache_core::storage::{Persistence, RepositoryError, Result};

use crate::storage::deleted_at_now;

/// Rows of one entity plus its auto-increment counter.
#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<EntityId, Record>,
    last_id: EntityId,
}

impl Table {
    fn live(&self, id: EntityId) -> Option<&Record> {
        self.rows.get(&id).filter(|row| !is_trashed(row))
    }
}

type Tables = HashMap<String, Table>;

/// In-memory storage backend for tests and development.
///
/// One table per entity name, each behind the same `Arc<RwLock<_>>`. Data is
/// not persisted and is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPersistence {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored for `entity`, trashed rows included.
    pub async fn row_count(&self, entity: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(entity).map_or(0, |table| table.rows.len())
    }
}

fn rows_of<'a>(tables: &'a Tables, name: &str) -> Vec<&'a Record> {
    tables
        .get(name)
        .map(|table| table.rows.values().collect())
        .unwrap_or_default()
}

fn related_rows(tables: &Tables, name: &str) -> Vec<Record> {
    rows_of(tables, name).into_iter().cloned().collect()
}

/// Rows matching the query's filters, trash rule and `has` constraint.
fn matching(tables: &Tables, schema: &EntitySchema, query: &Query) -> Result<Vec<Record>> {
    let has = match &query.has {
        Some(name) => {
            let relation = resolve_relations(schema, [name.as_str()])?.remove(0);
            Some((relation, related_rows(tables, relation.related)))
        }
        None => None,
    };

    Ok(rows_of(tables, schema.name)
        .into_iter()
        .filter(|row| query.with_trashed || !is_trashed(row))
        .filter(|row| matches_filters(row, &query.filters))
        .filter(|row| match &has {
            Some((relation, related)) => has_related(row, relation, related),
            None => true,
        })
        .cloned()
        .collect())
}

fn load_relations(
    tables: &Tables,
    schema: &EntitySchema,
    records: &mut [Record],
    with: &BTreeSet<String>,
) -> Result<()> {
    for relation in resolve_relations(schema, with.iter().map(String::as_str))? {
        attach_relation(records, relation, &related_rows(tables, relation.related));
    }
    Ok(())
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn fetch(&self, schema: &EntitySchema, query: &Query) -> Result<Vec<Record>> {
        validate_query(schema, query)?;
        let tables = self.tables.read().await;

        let mut records = matching(&tables, schema, query)?;
        if let Some(order) = &query.order {
            sort_records(&mut records, order);
        }
        let mut records = window(records, query.offset, query.limit);
        load_relations(&tables, schema, &mut records, &query.with)?;

        Ok(records
            .into_iter()
            .map(|record| project(record, &query.columns, &query.with))
            .collect())
    }

    async fn count(&self, schema: &EntitySchema, query: &Query) -> Result<u64> {
        validate_query(schema, query)?;
        let tables = self.tables.read().await;
        Ok(matching(&tables, schema, query)?.len() as u64)
    }

    async fn find(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        columns: &Columns,
        with: &BTreeSet<String>,
    ) -> Result<Option<Record>> {
        let tables = self.tables.read().await;
        let Some(row) = tables.get(schema.name).and_then(|table| table.live(id)) else {
            return Ok(None);
        };

        let mut records = vec![row.clone()];
        load_relations(&tables, schema, &mut records, with)?;
        Ok(records.pop().map(|record| project(record, columns, with)))
    }

    async fn insert(&self, schema: &EntitySchema, record: Record) -> Result<Record> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(schema.name.to_string()).or_default();

        table.last_id += 1;
        let id = table.last_id;
        let mut record = writable(record);
        record.insert(ID_FIELD.to_string(), Value::from(id));
        table.rows.insert(id, record.clone());

        Ok(record)
    }

    async fn update(&self, schema: &EntitySchema, id: EntityId, changes: Record) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(schema.name)
            .and_then(|table| table.rows.get_mut(&id))
            .filter(|row| !is_trashed(row))
        else {
            return Ok(false);
        };

        row.extend(writable(changes));
        Ok(true)
    }

    async fn delete(&self, schema: &EntitySchema, id: EntityId) -> Result<()> {
        if self.destroy(schema, &[id]).await? == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: schema.name,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn destroy(&self, schema: &EntitySchema, ids: &[EntityId]) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(schema.name) else {
            return Ok(0);
        };

        let mut removed = 0;
        for id in ids {
            if table.live(*id).is_none() {
                continue;
            }
            if schema.soft_deletes {
                if let Some(row) = table.rows.get_mut(id) {
                    row.insert(DELETED_AT_FIELD.to_string(), Value::from(deleted_at_now()));
                }
            } else {
                table.rows.remove(id);
            }
            removed += 1;
        }

        Ok(removed)
    }

    async fn force_delete(&self, schema: &EntitySchema, id: EntityId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(schema.name)
            .and_then(|table| table.rows.remove(&id));

        match removed {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound {
                entity_type: schema.name,
                id: id.to_string(),
            }),
        }
    }

    async fn truncate(&self, schema: &EntitySchema) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.remove(schema.name);
        Ok(())
    }
}
