//! Cache backing stores

use std::collections::HashMap;
use std::sync::{
    Mutex,
    PoisonError,
};
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{
    ConnectionManager,
    ConnectionManagerConfig,
};
use tokio::sync::OnceCell;
use tokio::time::Instant;

use super::CacheError;
use crate::bundle::TranslationBundle;

/// Key-value storage with per-entry expiry.
///
/// Implementations only decide where entries live. The fetch-or-compute
/// contract sits in [`super::TranslationCache`] and is identical for all of them.
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Returns the live entry under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<TranslationBundle>, CacheError>;

    /// Stores `bundle` under `key`, replacing any entry and restarting its TTL.
    async fn set(
        &self,
        key: &str,
        bundle: &TranslationBundle,
        ttl: Duration,
    ) -> Result<(), CacheError>;
}

/// A stored bundle and when it stops being served.
#[derive(Debug)]
struct MemoryEntry {
    /// Cached value
    bundle: TranslationBundle,
    /// Expiry deadline
    expires_at: Instant,
}

impl MemoryEntry {
    /// Whether the entry is still within its TTL.
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local store. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Entries by namespaced key
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<TranslationBundle>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        Ok(entries.get(key).map(|entry| entry.bundle.clone()))
    }

    async fn set(
        &self,
        key: &str,
        bundle: &TranslationBundle,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = MemoryEntry { bundle: bundle.clone(), expires_at: Instant::now() + ttl };
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), entry);
        Ok(())
    }
}

/// Connect attempt bound, so an unreachable redis only delays a miss briefly.
const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-command bound on a connected redis.
const REDIS_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed store shared between processes.
///
/// Bundles are stored as JSON strings with `SET .. EX`. The connection is
/// opened on first use and shared across callers. After a dropped socket or a
/// server restart the command in flight fails and the manager reconnects in
/// the background.
pub struct RedisStore {
    /// Connection factory
    client: redis::Client,
    /// Lazily opened, self-healing shared connection
    connection: OnceCell<ConnectionManager>,
}

impl RedisStore {
    /// Parses `url` without connecting.
    ///
    /// # Errors
    /// Returns [`CacheError::Redis`] if the URL is not a valid redis URL.
    pub fn open(url: &str) -> Result<Self, CacheError> {
        Ok(Self { client: redis::Client::open(url)?, connection: OnceCell::new() })
    }

    /// Shared connection, opened on first call.
    ///
    /// A failed first connect leaves nothing cached, so the next call retries.
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                tracing::debug!("Opening redis connection");
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(1)
                    .set_connection_timeout(REDIS_CONNECT_TIMEOUT)
                    .set_response_timeout(REDIS_RESPONSE_TIMEOUT);
                self.client.get_connection_manager_with_config(config).await
            })
            .await?;
        Ok(connection.clone())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connected", &self.connection.initialized())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<TranslationBundle>, CacheError> {
        let mut connection = self.connection().await?;
        let raw: Option<String> = connection.get(key).await?;
        Ok(raw.map(|text| serde_json::from_str(&text)).transpose()?)
    }

    async fn set(
        &self,
        key: &str,
        bundle: &TranslationBundle,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(bundle)?;
        let mut connection = self.connection().await?;
        connection.set_ex::<_, _, ()>(key, payload, ttl.as_secs().max(1)).await?;
        Ok(())
    }
}
