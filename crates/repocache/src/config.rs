use std::{env, time::Duration};

/// Repository layer configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether repositories are wrapped in the cache decorator (default: true)
    pub cache_enabled: bool,
    /// Cache TTL in minutes (default: 30)
    pub cache_time_minutes: u64,
    /// Maximum number of entries held by the memory cache (default: 10,000)
    pub cache_max_entries: usize,
    /// Locale used in cache keys (default: "en")
    pub locale: String,
    /// Path to SQLite database file (default: "repocache.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `REPOSITORY_CACHE_ENABLED` - Enable the cache decorator (default: true)
    /// - `REPOSITORY_CACHE_TIME` - Cache TTL in minutes (default: 30)
    /// - `REPOSITORY_CACHE_MAX_ENTRIES` - Maximum memory cache entries (default: 10,000)
    /// - `APP_LOCALE` - Locale used in cache keys (default: "en")
    /// - `SQLITE_PATH` - SQLite database path (default: "repocache.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            cache_enabled: lookup("REPOSITORY_CACHE_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
            cache_time_minutes: lookup("REPOSITORY_CACHE_TIME")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(30),
            cache_max_entries: lookup("REPOSITORY_CACHE_MAX_ENTRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(10_000),
            locale: lookup("APP_LOCALE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "en".to_string()),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "repocache.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_time_minutes.saturating_mul(60))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
