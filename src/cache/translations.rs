//! Cache-aside layer for remote bundles

use std::collections::HashMap;
use std::future::Future;
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use super::{
    CacheError,
    CacheStore,
    MemoryStore,
    RedisStore,
};
use crate::bundle::TranslationBundle;
use crate::config::CacheSettings;
use crate::types::Locale;

/// How long a fetched bundle is served before the remote is asked again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Prefix isolating our entries from other users of a shared store.
pub const KEY_NAMESPACE: &str = "i18n-http-backend";

/// Per-locale locks serializing cache misses.
type FlightLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// A caller's place in the queue for one locale's miss.
///
/// Dropping it releases the lock and removes the table entry once no other
/// caller holds it, so the table only ever contains locales being fetched.
struct Flight<'a> {
    /// Table the lock lives in
    locks: &'a FlightLocks,
    /// Store key the lock guards
    key: String,
    /// Lock shared with concurrent callers for `key`
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Set once the lock is acquired
    guard: Option<OwnedMutexGuard<()>>,
}

impl Flight<'_> {
    /// Waits for earlier callers for the same key to finish.
    async fn acquire(&mut self) {
        self.guard = Some(Arc::clone(&self.lock).lock_owned().await);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // the table's reference plus ours: nobody else is queued
        if Arc::strong_count(&self.lock) == 2
            && locks.get(&self.key).is_some_and(|lock| Arc::ptr_eq(lock, &self.lock))
        {
            locks.remove(&self.key);
        }
    }
}

/// Fetch-or-compute cache of remote bundles keyed by locale.
///
/// Only present bundles are stored. A miss that computes nothing leaves the
/// cache untouched, so the next call asks the remote again.
#[derive(Debug)]
pub struct TranslationCache {
    /// Where entries live
    store: Arc<dyn CacheStore>,
    /// Lifetime of each stored bundle
    ttl: Duration,
    /// `Some` when concurrent misses for one locale are coalesced
    flights: Option<FlightLocks>,
}

impl TranslationCache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store, ttl: DEFAULT_TTL, flights: Some(FlightLocks::default()) }
    }

    /// Cache backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Redis when a URL is configured, process memory otherwise.
    ///
    /// # Errors
    /// Returns [`CacheError::Redis`] if the redis URL cannot be parsed.
    pub fn from_settings(settings: &CacheSettings) -> Result<Self, CacheError> {
        let cache = if let Some(url) = &settings.redis_url {
            tracing::info!("Caching remote translations in redis");
            Self::new(Arc::new(RedisStore::open(url)?))
        } else {
            tracing::info!("Caching remote translations in memory");
            Self::in_memory()
        };
        Ok(cache.with_coalescing(settings.coalesce_fetches))
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(FlightLocks::default);
        self
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Namespaced store key for `locale`.
    #[must_use]
    pub fn key_for(locale: &Locale) -> String {
        format!("{KEY_NAMESPACE}:{locale}")
    }

    /// Returns the cached bundle for `locale`, computing and storing it on a miss.
    ///
    /// With coalescing on, concurrent misses for the same locale queue behind
    /// one lock and re-check the store, so only the first runs `compute`.
    ///
    /// Store failures never fail the call: a failed read is a miss and a
    /// failed write still returns the computed bundle.
    ///
    /// # Errors
    /// Whatever `compute` returns.
    pub async fn fetch_or_compute<F, Fut, E>(
        &self,
        locale: &Locale,
        compute: F,
    ) -> Result<Option<TranslationBundle>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<TranslationBundle>, E>>,
    {
        let key = Self::key_for(locale);

        if let Some(hit) = self.read(&key).await {
            return Ok(Some(hit));
        }

        let mut flight = self.join_flight(&key);
        if let Some(flight) = &mut flight {
            flight.acquire().await;
            if let Some(hit) = self.read(&key).await {
                tracing::trace!(%locale, "Served by a concurrent fetch");
                return Ok(Some(hit));
            }
        }

        tracing::debug!(%locale, store = self.store.name(), "Cache miss");
        let computed = compute().await?;

        if let Some(bundle) = &computed
            && let Err(e) = self.store.set(&key, bundle, self.ttl).await
        {
            tracing::warn!(%locale, error = %e, "Failed to cache bundle");
        }

        drop(flight);
        Ok(computed)
    }

    /// Overwrites the entry for `locale` and restarts its TTL.
    ///
    /// # Errors
    /// Returns the store's error.
    pub async fn write(&self, locale: &Locale, bundle: &TranslationBundle) -> Result<(), CacheError> {
        self.store.set(&Self::key_for(locale), bundle, self.ttl).await
    }

    /// Store read that treats failures as a miss.
    async fn read(&self, key: &str) -> Option<TranslationBundle> {
        match self.store.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Queues for the lock guarding misses for `key`, creating it if needed.
    fn join_flight(&self, key: &str) -> Option<Flight<'_>> {
        let locks = self.flights.as_ref()?;
        let lock = Arc::clone(
            locks.lock().unwrap_or_else(PoisonError::into_inner).entry(key.to_string()).or_default(),
        );
        Some(Flight { locks, key: key.to_string(), lock, guard: None })
    }

    /// Number of locales with a miss in progress.
    #[cfg(test)]
    fn flights_in_progress(&self) -> usize {
        self.flights
            .as_ref()
            .map_or(0, |locks| locks.lock().unwrap_or_else(PoisonError::into_inner).len())
    }
}
