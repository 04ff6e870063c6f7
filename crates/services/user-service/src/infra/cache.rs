//! Cache clients.
//!
//! The repository only needs document-style get/set plus expiry and delete,
//! so the cache is consumed through [`CacheStore`]. [`RedisCache`] talks to a
//! RedisJSON-enabled server; [`MemoryCache`] keeps entries in process for
//! local development and tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use common::{AppResult, CacheConfig};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// URL scheme selecting the in-process cache
pub const MEMORY_CACHE_SCHEME: &str = "memory://";

/// Key/value store with JSON-document values and per-key expiry.
///
/// All writes are unconditional overwrites; concurrent writers on one key race
/// and the last write wins.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the JSON document stored at `key`. `Ok(None)` when absent.
    async fn get_document(&self, key: &str) -> AppResult<Option<String>>;

    /// Replace the JSON document stored at `key`.
    async fn set_document(&self, key: &str, json: &str) -> AppResult<()>;

    /// Set the time-to-live of `key` in seconds.
    async fn expire(&self, key: &str, seconds: u64) -> AppResult<()>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> AppResult<()>;
}

// =============================================================================
// Redis
// =============================================================================

/// Redis cache using the RedisJSON document commands.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis, returning an error instead of panicking.
    pub async fn connect(config: &CacheConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_document(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("JSON.GET")
            .arg(key)
            .arg(".")
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set_document(&self, key: &str, json: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("JSON.SET")
            .arg(key)
            .arg(".")
            .arg(json)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.expire(key, seconds as i64).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

// =============================================================================
// In-process
// =============================================================================

/// Upper bound on entries held by [`MemoryCache`]
pub const MEMORY_CACHE_MAX_ENTRIES: u64 = 10_000;

#[derive(Clone)]
struct MemoryEntry {
    value: Arc<str>,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

/// Expires each entry after its own TTL; an entry without one never expires.
struct PerEntryTtl;

impl Expiry<String, MemoryEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process cache on `moka`, with Redis-like per-key expiry.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, MemoryEntry>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(MEMORY_CACHE_MAX_ENTRIES)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    /// Remaining lifetime of `key`; `None` when absent or without expiry.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let expires_at = self.entries.get(key).await?.expires_at?;
        Some(expires_at.saturating_duration_since(Instant::now()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Live entries, after expired ones have been reclaimed.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_document(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self
            .entries
            .get(key)
            .await
            .map(|entry| entry.value.to_string()))
    }

    async fn set_document(&self, key: &str, json: &str) -> AppResult<()> {
        // Like JSON.SET, a plain overwrite drops any previous expiry
        let entry = MemoryEntry {
            value: Arc::from(json),
            ttl: None,
            expires_at: None,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> AppResult<()> {
        let Some(mut entry) = self.entries.get(key).await else {
            return Ok(());
        };
        let ttl = Duration::from_secs(seconds);
        entry.ttl = Some(ttl);
        entry.expires_at = Some(Instant::now() + ttl);
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}
