use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Key-value cache whose entries carry tags.
///
/// An entry is addressed by its tag set and key together. Flushing a tag
/// invalidates every entry stored under it, whatever its other tags.
#[async_trait]
pub trait TaggedCache: Send + Sync {
    /// Gets a value by tags and key.
    async fn get(&self, tags: &[String], key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores a value with an optional TTL.
    async fn put(
        &self,
        tags: &[String],
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Removes a single entry.
    async fn forget(&self, tags: &[String], key: &str) -> Result<()>;

    /// Invalidates every entry stored under any of `tags`.
    async fn flush(&self, tags: &[String]) -> Result<()>;
}
