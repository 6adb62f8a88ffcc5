use std::fmt;

use serde_json::Value;

use super::{CacheError, Result};

/// Tag attached to every repository entry. Never flushed by repositories.
pub const GLOBAL_TAG: &str = "global";

/// Returns the tags every cached read of `entity` is stored under.
pub fn repository_tags(entity: &str) -> Vec<String> {
    vec![entity.to_string(), GLOBAL_TAG.to_string()]
}

/// Deterministic key of a cached repository read.
///
/// Renders as `{locale}.{entity}.{operation}.{arguments}`, where `arguments`
/// is the JSON array of the call's arguments.
///
/// # Examples
///
/// ```
/// use repocache_core::cache::CacheKey;
/// use serde_json::json;
///
/// let key = CacheKey::new("en", "posts", "find").arg(1).arg(json!(["*"]));
/// assert_eq!(key.to_string(), r#"en.posts.find.[1,["*"]]"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    locale: String,
    entity: String,
    operation: &'static str,
    arguments: Vec<Value>,
}

impl CacheKey {
    pub fn new(
        locale: impl Into<String>,
        entity: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self {
            locale: locale.into(),
            entity: entity.into(),
            operation,
            arguments: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.arguments.push(value.into());
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments = Value::Array(self.arguments.clone());
        write!(
            f,
            "{}.{}.{}.{}",
            self.locale, self.entity, self.operation, arguments
        )
    }
}

/// Namespaces `key` by its tag set, so the same key stored under different
/// tags lives in different slots.
pub fn tagged_key(tags: &[String], key: &str) -> String {
    format!("tagged:{}:{}", tags.join("|"), key)
}

/// Checks that every tag survives [`tagged_key`] and [`tagged_key_tags`].
pub fn validate_tags(tags: &[String]) -> Result<()> {
    match tags
        .iter()
        .find(|tag| tag.is_empty() || tag.contains([':', '|']))
    {
        Some(tag) => Err(CacheError::InvalidTag(tag.clone())),
        None => Ok(()),
    }
}

/// Recovers the tag set a key was namespaced with by [`tagged_key`].
///
/// Returns an empty list for keys that were not produced by it.
pub fn tagged_key_tags(tagged: &str) -> Vec<String> {
    tagged
        .strip_prefix("tagged:")
        .and_then(|rest| rest.split_once(':'))
        .map(|(tags, _)| {
            tags.split('|')
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the key of the set tracking every entry stored under `tag`.
///
/// Flushing a tag deletes the tracked keys and then the set itself, which
/// avoids scanning the keyspace.
pub fn tag_tracking_key(tag: &str) -> String {
    format!("tag:{}:_keys", tag)
}
