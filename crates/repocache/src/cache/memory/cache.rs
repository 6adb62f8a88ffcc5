//! In-memory tagged cache with LRU eviction.
//!
//! Mirrors the Redis backend: every entry is stored under its tagged key, and
//! each tag tracks the tagged keys stored under it so a flush touches only
//! those entries.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use repocache_core::cache::{tagged_key, tagged_key_tags, validate_tags, Result, TaggedCache};

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        // A TTL past the clock's range never expires.
        let expires_at = ttl.and_then(|d| Instant::now().checked_add(d));
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// In-memory tagged cache.
///
/// TTL expiry is lazy: an expired entry reads as a miss and is removed on
/// that read. Once `max_entries` is reached the least recently used entry is
/// evicted. Evicted, expired and flushed keys leave every tracking set, so
/// tracking never outgrows the store.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// Maps tag -> tagged keys stored under it.
    tracking: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_entries` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            tracking: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of live and expired entries currently held.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of tagged keys tracked under `tag`.
    pub async fn tracked(&self, tag: &str) -> usize {
        self.tracking.read().await.get(tag).map_or(0, HashSet::len)
    }
}

/// Removes `key` from the sets of the tags it was stored under.
fn untrack(tracking: &mut HashMap<String, HashSet<String>>, key: &str) {
    for tag in tagged_key_tags(key) {
        if let Some(keys) = tracking.get_mut(&tag) {
            keys.remove(key);
            if keys.is_empty() {
                tracking.remove(&tag);
            }
        }
    }
}

#[async_trait]
impl TaggedCache for MemoryCache {
    async fn get(&self, tags: &[String], key: &str) -> Result<Option<Vec<u8>>> {
        let key = tagged_key(tags, key);
        let mut store = self.store.write().await;

        match store.get(&key) {
            Some(entry) if entry.is_expired() => {
                store.pop(&key);
                untrack(&mut *self.tracking.write().await, &key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        tags: &[String],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        validate_tags(tags)?;
        let key = tagged_key(tags, key);
        let mut store = self.store.write().await;
        let mut tracking = self.tracking.write().await;

        let entry = CacheEntry::new(value.to_vec(), ttl);
        if let Some((evicted, _)) = store.push(key.clone(), entry) {
            if evicted != key {
                untrack(&mut tracking, &evicted);
            }
        }
        for tag in tags {
            tracking.entry(tag.clone()).or_default().insert(key.clone());
        }

        Ok(())
    }

    async fn forget(&self, tags: &[String], key: &str) -> Result<()> {
        let key = tagged_key(tags, key);
        let mut store = self.store.write().await;
        let mut tracking = self.tracking.write().await;

        store.pop(&key);
        untrack(&mut tracking, &key);

        Ok(())
    }

    async fn flush(&self, tags: &[String]) -> Result<()> {
        let mut store = self.store.write().await;
        let mut tracking = self.tracking.write().await;

        let flushed: HashSet<String> = tags
            .iter()
            .filter_map(|tag| tracking.remove(tag))
            .flatten()
            .collect();

        for key in &flushed {
            store.pop(key);
            untrack(&mut tracking, key);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocache_core::cache::{repository_tags, CacheError};

    const TEST_MAX_ENTRIES: usize = 1000;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let tags = repository_tags("posts");

        cache.put(&tags, "k", b"value", None).await.unwrap();

        assert_eq!(cache.get(&tags, "k").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let result = cache.get(&tags(&["posts"]), "missing").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_same_key_under_other_tags_is_distinct() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache.put(&tags(&["posts"]), "k", b"a", None).await.unwrap();

        assert!(cache.get(&tags(&["users"]), "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forget() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let tags = tags(&["posts"]);

        cache.put(&tags, "k", b"value", None).await.unwrap();
        cache.forget(&tags, "k").await.unwrap();

        assert!(cache.get(&tags, "k").await.unwrap().is_none());
        assert!(cache.tracking.read().await.get("posts").is_none());
    }

    #[tokio::test]
    async fn test_flush_removes_only_tagged_entries() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let posts = repository_tags("posts");
        let users = repository_tags("users");

        cache.put(&posts, "a", b"1", None).await.unwrap();
        cache.put(&posts, "b", b"2", None).await.unwrap();
        cache.put(&users, "a", b"3", None).await.unwrap();

        cache.flush(&tags(&["posts"])).await.unwrap();

        assert!(cache.get(&posts, "a").await.unwrap().is_none());
        assert!(cache.get(&posts, "b").await.unwrap().is_none());
        assert_eq!(cache.get(&users, "a").await.unwrap(), Some(b"3".to_vec()));
        assert!(cache.tracking.read().await.get("posts").is_none());
    }

    #[tokio::test]
    async fn test_flush_unknown_tag_is_noop() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let posts = repository_tags("posts");
        cache.put(&posts, "a", b"1", None).await.unwrap();

        cache.flush(&tags(&["comments"])).await.unwrap();

        assert!(cache.get(&posts, "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let tags = tags(&["posts"]);

        cache
            .put(&tags, "k", b"short-lived", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(cache.get(&tags, "k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get(&tags, "k").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_overwrite_value() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let tags = tags(&["posts"]);

        cache.put(&tags, "k", b"first", None).await.unwrap();
        cache.put(&tags, "k", b"second", None).await.unwrap();

        assert_eq!(cache.get(&tags, "k").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryCache::new(3);
        let tags = tags(&["posts"]);

        cache.put(&tags, "key1", b"1", None).await.unwrap();
        cache.put(&tags, "key2", b"2", None).await.unwrap();
        cache.put(&tags, "key3", b"3", None).await.unwrap();

        cache.get(&tags, "key1").await.unwrap();
        cache.put(&tags, "key4", b"4", None).await.unwrap();

        assert!(cache.get(&tags, "key1").await.unwrap().is_some());
        assert!(cache.get(&tags, "key2").await.unwrap().is_none());
        assert!(cache.get(&tags, "key3").await.unwrap().is_some());
        assert!(cache.get(&tags, "key4").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let cache = MemoryCache::new(0);
        let tags = tags(&["posts"]);

        cache.put(&tags, "k", b"v", None).await.unwrap();

        assert!(cache.get(&tags, "k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tracking_stays_bounded_by_capacity() {
        let cache = MemoryCache::new(2);
        let tags = repository_tags("posts");

        for i in 0..1000 {
            cache
                .put(&tags, &format!("k{i}"), b"v", None)
                .await
                .unwrap();
            assert!(cache.tracked("global").await <= 2);
            if i % 10 == 9 {
                cache.flush(&tags[..1]).await.unwrap();
            }
        }
        cache.flush(&tags[..1]).await.unwrap();

        assert_eq!(cache.tracked("posts").await, 0);
        assert_eq!(cache.tracked("global").await, 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_flush_removes_keys_from_other_tags() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let posts = repository_tags("posts");
        let users = repository_tags("users");

        cache.put(&posts, "a", b"1", None).await.unwrap();
        cache.put(&users, "a", b"2", None).await.unwrap();
        cache.flush(&tags(&["posts"])).await.unwrap();

        assert_eq!(cache.tracked("global").await, 1);
        assert_eq!(cache.tracked("users").await, 1);
    }

    #[tokio::test]
    async fn test_expired_read_untracks_key() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let tags = repository_tags("posts");

        cache
            .put(&tags, "k", b"v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.get(&tags, "k").await.unwrap().is_none());
        assert_eq!(cache.tracked("posts").await, 0);
        assert_eq!(cache.tracked("global").await, 0);
    }

    #[tokio::test]
    async fn test_put_rejects_tags_that_break_tagged_keys() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        let err = cache
            .put(&tags(&["posts:drafts"]), "k", b"v", None)
            .await
            .unwrap_err();

        assert_eq!(err, CacheError::InvalidTag("posts:drafts".to_string()));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let tags = tags(&["posts"]);

        cache
            .put(&tags, "k", b"v", Some(Duration::from_secs(u64::MAX)))
            .await
            .unwrap();

        assert!(cache.get(&tags, "k").await.unwrap().is_some());
    }
}
