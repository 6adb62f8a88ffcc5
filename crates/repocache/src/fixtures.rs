//! Test entities and mock collaborators shared by the unit tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use repocache_core::cache::{tagged_key, CacheError, Result as CacheResult, TaggedCache};
use repocache_core::entity::{Entity, EntityId, EntitySchema, Record, Relation};
use repocache_core::query::{Attributes, Columns, Query};
use repocache_core::storage::{Persistence, Result};

use crate::storage::InMemoryPersistence;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub comments: Vec<Comment>,
}

impl Entity for Post {
    const NAME: &'static str = "posts";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn relations() -> Vec<Relation> {
        vec![Relation::has_many("comments", "comments", "post_id")]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub post_id: EntityId,
    pub body: String,
}

impl Entity for Comment {
    const NAME: &'static str = "comments";

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

pub fn post_attributes(title: &str, slug: &str, status: &str) -> Attributes {
    Attributes::from([("title", title), ("slug", slug), ("status", status)])
}

/// In-memory persistence that counts every call it receives.
#[derive(Default)]
pub struct CountingPersistence {
    inner: InMemoryPersistence,
    fetch: AtomicUsize,
    count: AtomicUsize,
    find: AtomicUsize,
    insert: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    destroy: AtomicUsize,
    force_delete: AtomicUsize,
    truncate: AtomicUsize,
}

impl CountingPersistence {
    pub fn fetch_calls(&self) -> usize {
        self.fetch.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.fetch,
            &self.count,
            &self.find,
            &self.insert,
            &self.update,
            &self.delete,
            &self.destroy,
            &self.force_delete,
            &self.truncate,
        ]
        .iter()
        .map(|counter| counter.load(Ordering::SeqCst))
        .sum()
    }

    /// Inserts a post without counting the call.
    pub async fn seed_post(&self, attributes: Attributes) -> Record {
        self.inner
            .insert(&Post::schema(), attributes.into_record())
            .await
            .unwrap()
    }

    /// Inserts a comment without counting the call.
    pub async fn add_comment(&self, post_id: EntityId, body: &str) -> Record {
        let attributes = Attributes::new().with("post_id", post_id).with("body", body);
        self.inner
            .insert(&Comment::schema(), attributes.into_record())
            .await
            .unwrap()
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl Persistence for CountingPersistence {
    async fn fetch(&self, schema: &EntitySchema, query: &Query) -> Result<Vec<Record>> {
        bump(&self.fetch);
        self.inner.fetch(schema, query).await
    }

    async fn count(&self, schema: &EntitySchema, query: &Query) -> Result<u64> {
        bump(&self.count);
        self.inner.count(schema, query).await
    }

    async fn find(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        columns: &Columns,
        with: &BTreeSet<String>,
    ) -> Result<Option<Record>> {
        bump(&self.find);
        self.inner.find(schema, id, columns, with).await
    }

    async fn insert(&self, schema: &EntitySchema, record: Record) -> Result<Record> {
        bump(&self.insert);
        self.inner.insert(schema, record).await
    }

    async fn update(&self, schema: &EntitySchema, id: EntityId, changes: Record) -> Result<bool> {
        bump(&self.update);
        self.inner.update(schema, id, changes).await
    }

    async fn delete(&self, schema: &EntitySchema, id: EntityId) -> Result<()> {
        bump(&self.delete);
        self.inner.delete(schema, id).await
    }

    async fn destroy(&self, schema: &EntitySchema, ids: &[EntityId]) -> Result<usize> {
        bump(&self.destroy);
        self.inner.destroy(schema, ids).await
    }

    async fn force_delete(&self, schema: &EntitySchema, id: EntityId) -> Result<()> {
        bump(&self.force_delete);
        self.inner.force_delete(schema, id).await
    }

    async fn truncate(&self, schema: &EntitySchema) -> Result<()> {
        bump(&self.truncate);
        self.inner.truncate(schema).await
    }
}

/// Tagged cache that records what it is asked to do.
#[derive(Default)]
pub struct MockCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    tracking: RwLock<HashMap<String, HashSet<String>>>,
    flushed: RwLock<Vec<Vec<String>>>,
    last_ttl: RwLock<Option<Duration>>,
    failure: RwLock<Option<String>>,
}

impl MockCache {
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn last_ttl(&self) -> Option<Duration> {
        *self.last_ttl.read().await
    }

    pub async fn flushed(&self) -> Vec<Vec<String>> {
        self.flushed.read().await.clone()
    }

    /// Makes every following operation fail with `ConnectionFailed`.
    pub async fn fail_with(&self, message: &str) {
        *self.failure.write().await = Some(message.to_string());
    }

    async fn check(&self) -> CacheResult<()> {
        match self.failure.read().await.as_ref() {
            Some(message) => Err(CacheError::ConnectionFailed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaggedCache for MockCache {
    async fn get(
        &self,
        tags: &[String],
        key: &str,
    ) -> CacheResult<Option<Vec<u8>>> {
        self.check().await?;
        Ok(self.entries.read().await.get(&tagged_key(tags, key)).cloned())
    }

    async fn put(
        &self,
        tags: &[String],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.check().await?;
        let full_key = tagged_key(tags, key);
        self.entries
            .write()
            .await
            .insert(full_key.clone(), value.to_vec());

        let mut tracking = self.tracking.write().await;
        for tag in tags {
            tracking
                .entry(tag.clone())
                .or_default()
                .insert(full_key.clone());
        }
        *self.last_ttl.write().await = ttl;
        Ok(())
    }

    async fn forget(&self, tags: &[String], key: &str) -> CacheResult<()> {
        self.check().await?;
        self.entries.write().await.remove(&tagged_key(tags, key));
        Ok(())
    }

    async fn flush(&self, tags: &[String]) -> CacheResult<()> {
        self.check().await?;
        self.flushed.write().await.push(tags.to_vec());

        let mut tracking = self.tracking.write().await;
        let mut entries = self.entries.write().await;
        for tag in tags {
            for key in tracking.remove(tag).unwrap_or_default() {
                entries.remove(&key);
            }
        }
        Ok(())
    }
}
