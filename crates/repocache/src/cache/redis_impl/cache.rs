//! Redis tagged cache.
//!
//! Each tag owns a Redis Set (`tag:{name}:_keys`) listing the tagged keys
//! stored under it, so flushing a tag never needs SCAN. A tracking set expires
//! no earlier than its longest-lived member and never while it tracks an
//! entry without a TTL. Flushing a tag also removes its keys from the sets of
//! the other tags they were stored under.
//!
//! # Non-Atomicity
//!
//! `put` and `flush` issue several commands. A crash between them leaves at
//! worst a tracking set referencing keys that no longer exist, and DEL on a
//! missing key is a no-op, so the next flush finishes the cleanup.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Script};

use repocache_core::cache::{
    tag_tracking_key, tagged_key, tagged_key_tags, validate_tags, Result, TaggedCache,
};

use super::error::map_redis_error;

/// Adds `ARGV[1]` to every set in `KEYS` and stretches each set's expiry to
/// `ARGV[2]` seconds. A TTL of `0` means the entry never expires, which makes
/// the set persistent.
const TRACK_SCRIPT: &str = r"
local ttl = tonumber(ARGV[2])
for _, set in ipairs(KEYS) do
    local current = redis.call('TTL', set)
    redis.call('SADD', set, ARGV[1])
    if ttl == 0 then
        redis.call('PERSIST', set)
    elseif current == -2 or (current >= 0 and current < ttl) then
        redis.call('EXPIRE', set, ttl)
    end
end
return 1
";

/// Redis tagged cache using a connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
    track: Script,
}

impl RedisCache {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self {
            conn,
            track: Script::new(TRACK_SCRIPT),
        })
    }
}

#[async_trait]
impl TaggedCache for RedisCache {
    async fn get(&self, tags: &[String], key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn
            .get(tagged_key(tags, key))
            .await
            .map_err(map_redis_error)?;
        Ok(result)
    }

    async fn put(
        &self,
        tags: &[String],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        validate_tags(tags)?;
        let mut conn = self.conn.clone();
        let key = tagged_key(tags, key);

        let seconds = match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(&key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
                seconds
            }
            None => {
                conn.set::<_, _, ()>(&key, value)
                    .await
                    .map_err(map_redis_error)?;
                0
            }
        };

        if !tags.is_empty() {
            let mut invocation = self.track.prepare_invoke();
            for tag in tags {
                invocation.key(tag_tracking_key(tag));
            }
            let _: () = invocation
                .arg(&key)
                .arg(seconds)
                .invoke_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }

    async fn forget(&self, tags: &[String], key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = tagged_key(tags, key);

        conn.del::<_, ()>(&key).await.map_err(map_redis_error)?;
        for tag in tags {
            conn.srem::<_, _, ()>(tag_tracking_key(tag), &key)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }

    async fn flush(&self, tags: &[String]) -> Result<()> {
        let mut conn = self.conn.clone();
        let flushed_tags: HashSet<&str> = tags.iter().map(String::as_str).collect();
        let mut others: HashMap<String, Vec<String>> = HashMap::new();

        for tag in tags {
            let tracking_key = tag_tracking_key(tag);
            let tracked_keys: Vec<String> = conn
                .smembers(&tracking_key)
                .await
                .map_err(map_redis_error)?;

            if !tracked_keys.is_empty() {
                conn.del::<_, ()>(&tracked_keys)
                    .await
                    .map_err(map_redis_error)?;
            }

            conn.del::<_, ()>(&tracking_key)
                .await
                .map_err(map_redis_error)?;

            for key in tracked_keys {
                for other in tagged_key_tags(&key) {
                    if !flushed_tags.contains(other.as_str()) {
                        others.entry(other).or_default().push(key.clone());
                    }
                }
            }
        }

        for (tag, keys) in others {
            conn.srem::<_, _, ()>(tag_tracking_key(&tag), &keys)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }
}
