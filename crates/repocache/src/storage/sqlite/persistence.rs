//! SQLite persistence backend.
//!
//! Implements `Persistence` from `repocache_core::storage` on top of
//! `tokio-rusqlite`. Attributes are stored as JSON and queried with
//! `json_extract`, so one table layout serves every entity.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_rusqlite::Connection;

use repocache_core::entity::{EntityId, EntitySchema, Record, RelationKind, ID_FIELD};
use repocache_core::query::{Columns, Query};
use repocache_core::storage::records::{
    attach_relation, project, resolve_relations, validate_query, writable,
};
use repocache_core::storage::{Persistence, RepositoryError, Result};

use super::conversions::{attributes_json, row_to_record};
use super::error::{
    map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id, wrap_err, wrap_repo_err,
};
use super::schema as sql;
use crate::storage::deleted_at_now;

type CallResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

/// SQLite-based persistence.
///
/// Tables are created on first use of an entity.
pub struct SqlitePersistence {
    conn: Connection,
    ready: Mutex<HashSet<&'static str>>,
}

impl SqlitePersistence {
    /// Opens (or creates) a file-based database.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self::with_connection(conn))
    }

    /// Opens an in-memory database. Data is lost when dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            ready: Mutex::new(HashSet::new()),
        }
    }

    async fn ensure_tables(&self, schema: &EntitySchema) -> Result<()> {
        let mut ready = self.ready.lock().await;
        if ready.contains(schema.name) {
            return Ok(());
        }

        let statements = sql::create_tables(schema)?;
        self.conn
            .call(move |conn| conn.execute_batch(&statements).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, schema.name))?;

        ready.insert(schema.name);
        Ok(())
    }
}

fn query_records(
    conn: &rusqlite::Connection,
    statement: &str,
    params: &[SqlValue],
) -> CallResult<Vec<Record>> {
    let mut stmt = conn.prepare(statement).map_err(wrap_err)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), row_to_record)
        .map_err(wrap_err)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(wrap_err)?);
    }
    Ok(records)
}

fn load_relations(
    conn: &rusqlite::Connection,
    schema: &EntitySchema,
    records: &mut [Record],
    with: &BTreeSet<String>,
) -> CallResult<()> {
    let relations =
        resolve_relations(schema, with.iter().map(String::as_str)).map_err(wrap_repo_err)?;

    for relation in relations {
        let keys: Vec<Value> = records
            .iter()
            .filter_map(|record| match relation.kind {
                RelationKind::HasMany => record.get(ID_FIELD),
                RelationKind::BelongsTo => record.get(relation.foreign_key),
            })
            .filter(|key| !key.is_null())
            .cloned()
            .collect();

        let related = if keys.is_empty() {
            Vec::new()
        } else {
            let statement = sql::select_related(relation).map_err(wrap_repo_err)?;
            let keys = SqlValue::Text(Value::Array(keys).to_string());
            query_records(conn, &statement, &[keys])?
        };
        attach_relation(records, relation, &related);
    }
    Ok(())
}

fn live_row(conn: &rusqlite::Connection, table: &str, id: EntityId) -> CallResult<Option<Record>> {
    match conn.query_row(&sql::select_by_id(table), [id], row_to_record) {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(wrap_err(e)),
    }
}

#[async_trait]
impl Persistence for SqlitePersistence {
    async fn fetch(&self, schema: &EntitySchema, query: &Query) -> Result<Vec<Record>> {
        validate_query(schema, query)?;
        self.ensure_tables(schema).await?;

        let statement = sql::select(schema, query)?;
        let owned_schema = schema.clone();
        let columns = query.columns.clone();
        let with = query.with.clone();

        self.conn
            .call(move |conn| {
                let mut records = query_records(conn, &statement.sql, &statement.params)?;
                load_relations(conn, &owned_schema, &mut records, &with)?;
                Ok(records
                    .into_iter()
                    .map(|record| project(record, &columns, &with))
                    .collect())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, schema.name))
    }

    async fn count(&self, schema: &EntitySchema, query: &Query) -> Result<u64> {
        validate_query(schema, query)?;
        self.ensure_tables(schema).await?;

        let statement = sql::count(schema, query)?;
        let total = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    &statement.sql,
                    params_from_iter(statement.params.iter()),
                    |row| row.get::<_, i64>(0),
                )
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, schema.name))?;

        Ok(total.max(0) as u64)
    }

    async fn find(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        columns: &Columns,
        with: &BTreeSet<String>,
    ) -> Result<Option<Record>> {
        self.ensure_tables(schema).await?;

        let owned_schema = schema.clone();
        let columns = columns.clone();
        let with = with.clone();

        self.conn
            .call(move |conn| {
                let Some(record) = live_row(conn, owned_schema.name, id)? else {
                    return Ok(None);
                };
                let mut records = vec![record];
                load_relations(conn, &owned_schema, &mut records, &with)?;
                Ok(records.pop().map(|record| project(record, &columns, &with)))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, schema.name, id))
    }

    async fn insert(&self, schema: &EntitySchema, record: Record) -> Result<Record> {
        self.ensure_tables(schema).await?;

        let mut record = writable(record);
        let attributes = attributes_json(record.clone())?;
        let table = schema.name;

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(&sql::insert(table), [&attributes])
                    .map_err(wrap_err)?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, schema.name))?;

        record.insert(ID_FIELD.to_string(), Value::from(id));
        Ok(record)
    }

    async fn update(&self, schema: &EntitySchema, id: EntityId, changes: Record) -> Result<bool> {
        self.ensure_tables(schema).await?;

        let changes = writable(changes);
        let table = schema.name;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let Some(mut row) = live_row(&tx, table, id)? else {
                    return Ok(false);
                };

                row.extend(changes);
                let attributes = attributes_json(row).map_err(wrap_repo_err)?;
                tx.execute(&sql::update_attributes(table), params![id, attributes])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(true)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, schema.name, id))
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
        self.ensure_tables(schema).await?;

        let ids = ids.to_vec();
        let table = schema.name;
        let soft_deletes = schema.soft_deletes;
        let deleted_at = deleted_at_now();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut removed = 0;
                {
                    let statement = if soft_deletes {
                        sql::soft_delete(table)
                    } else {
                        sql::hard_delete(table)
                    };
                    let mut stmt = tx.prepare(&statement).map_err(wrap_err)?;
                    for id in ids {
                        removed += if soft_deletes {
                            stmt.execute(params![id, deleted_at])
                        } else {
                            stmt.execute([id])
                        }
                        .map_err(wrap_err)?;
                    }
                }
                tx.commit().map_err(wrap_err)?;
                Ok(removed)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, schema.name))
    }

    async fn force_delete(&self, schema: &EntitySchema, id: EntityId) -> Result<()> {
        self.ensure_tables(schema).await?;

        let table = schema.name;
        let removed = self
            .conn
            .call(move |conn| conn.execute(&sql::force_delete(table), [id]).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, schema.name, id))?;

        if removed == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: schema.name,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn truncate(&self, schema: &EntitySchema) -> Result<()> {
        self.ensure_tables(schema).await?;

        let table = schema.name;
        self.conn
            .call(move |conn| conn.execute_batch(&sql::truncate(table)).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, schema.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocache_core::entity::{Relation, DELETED_AT_FIELD};
    use repocache_core::query::SortOrder;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn posts() -> EntitySchema {
        EntitySchema::new("posts")
            .with_relation(Relation::has_many("comments", "comments", "post_id"))
            .with_relation(Relation::belongs_to("author", "users", "author_id"))
    }

    async fn seeded() -> SqlitePersistence {
        let store = SqlitePersistence::new_in_memory().await.unwrap();
        let schema = posts();
        for (title, status, author) in [
            ("b", "published", 1),
            ("a", "draft", 1),
            ("c", "published", 2),
        ] {
            store
                .insert(
                    &schema,
                    record(json!({"title": title, "status": status, "author_id": author})),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = SqlitePersistence::new_in_memory().await.unwrap();

        let first = store
            .insert(&posts(), record(json!({"id": 99, "title": "x"})))
            .await
            .unwrap();
        let second = store
            .insert(&posts(), record(json!({"title": "y"})))
            .await
            .unwrap();

        assert_eq!(Value::Object(first), json!({"id": 1, "title": "x"}));
        assert_eq!(second["id"], json!(2));
    }

    #[tokio::test]
    async fn test_fetch_filters_orders_and_windows() {
        let store = seeded().await;

        let query = Query::new()
            .filter("status", "published")
            .order_by("title", SortOrder::Desc);
        let rows = store.fetch(&posts(), &query).await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("c"), json!("b")]);

        let page = Query::new()
            .order_by("title", SortOrder::Asc)
            .offset(1)
            .limit(1);
        let rows = store.fetch(&posts(), &page).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], json!("b"));
        assert_eq!(store.count(&posts(), &page.unwindowed()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_filter_by_number_and_null() {
        let store = seeded().await;
        store
            .insert(&posts(), record(json!({"title": "d", "author_id": null})))
            .await
            .unwrap();

        let by_author = Query::new().filter("author_id", 1);
        assert_eq!(store.count(&posts(), &by_author).await.unwrap(), 2);

        let orphaned = Query::new().filter("author_id", Value::Null);
        let rows = store.fetch(&posts(), &orphaned).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], json!("d"));
    }

    #[tokio::test]
    async fn test_fetch_projects_columns() {
        let store = seeded().await;

        let query = Query::new().columns(Columns::only(["id", "title"])).limit(1);
        let rows = store.fetch(&posts(), &query).await.unwrap();

        assert_eq!(Value::Object(rows[0].clone()), json!({"id": 1, "title": "b"}));
    }

    #[tokio::test]
    async fn test_has_and_eager_loading() {
        let store = seeded().await;
        let comments = EntitySchema::new("comments");
        store
            .insert(&comments, record(json!({"post_id": 3, "body": "nice"})))
            .await
            .unwrap();
        let users = EntitySchema::new("users");
        store
            .insert(&users, record(json!({"name": "ada"})))
            .await
            .unwrap();

        let query = Query::new().has("comments").with(["comments", "author"]);
        let rows = store.fetch(&posts(), &query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(3));
        assert_eq!(
            rows[0]["comments"],
            json!([{"id": 1, "post_id": 3, "body": "nice"}])
        );
        assert_eq!(rows[0]["author"], json!(null));

        let first = store
            .find(&posts(), 1, &Columns::All, &BTreeSet::from(["author".to_string()]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first["author"], json!({"id": 1, "name": "ada"}));
    }

    #[tokio::test]
    async fn test_unknown_relation_is_rejected() {
        let store = seeded().await;
        let result = store.fetch(&posts(), &Query::new().with(["likes"])).await;
        assert!(matches!(result, Err(RepositoryError::UnknownRelation { .. })));
    }

    #[tokio::test]
    async fn test_update_merges_attributes() {
        let store = seeded().await;

        let updated = store
            .update(&posts(), 2, record(json!({"status": "published", "id": 50})))
            .await
            .unwrap();
        assert!(updated);

        let row = store
            .find(&posts(), 2, &Columns::All, &BTreeSet::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            Value::Object(row),
            json!({"id": 2, "title": "a", "status": "published", "author_id": 1})
        );

        assert!(!store.update(&posts(), 40, Record::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_hard_delete() {
        let store = seeded().await;

        store.delete(&posts(), 1).await.unwrap();
        assert_eq!(store.count(&posts(), &Query::new()).await.unwrap(), 2);

        let err = store.delete(&posts(), 1).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::NotFound {
                entity_type: "posts",
                id: "1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_soft_delete_hides_rows() {
        let store = seeded().await;
        let schema = posts().with_soft_deletes();

        let removed = store.destroy(&schema, &[1, 2, 42, 2]).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count(&schema, &Query::new()).await.unwrap(), 1);

        let trashed = store
            .fetch(&schema, &Query::new().with_trashed())
            .await
            .unwrap();
        assert_eq!(trashed.len(), 3);
        assert!(trashed[0].contains_key(DELETED_AT_FIELD));
        assert!(!trashed[2].contains_key(DELETED_AT_FIELD));

        assert!(store
            .find(&schema, 1, &Columns::All, &BTreeSet::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_force_delete_removes_trashed_rows() {
        let store = seeded().await;
        let schema = posts().with_soft_deletes();

        store.delete(&schema, 1).await.unwrap();
        store.force_delete(&schema, 1).await.unwrap();

        let all = store
            .fetch(&schema, &Query::new().with_trashed())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(matches!(
            store.force_delete(&schema, 1).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_truncate_resets_ids() {
        let store = seeded().await;

        store.truncate(&posts()).await.unwrap();
        assert_eq!(store.count(&posts(), &Query::new()).await.unwrap(), 0);

        let row = store
            .insert(&posts(), record(json!({"title": "fresh"})))
            .await
            .unwrap();
        assert_eq!(row["id"], json!(1));
    }

    #[tokio::test]
    async fn test_file_database_persists_between_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repocache.db");
        let path = path.to_str().unwrap();

        {
            let store = SqlitePersistence::new(path).await.unwrap();
            store
                .insert(&posts(), record(json!({"title": "kept"})))
                .await
                .unwrap();
        }

        let store = SqlitePersistence::new(path).await.unwrap();
        let rows = store.fetch(&posts(), &Query::new()).await.unwrap();
        assert_eq!(rows[0]["title"], json!("kept"));
    }
}
