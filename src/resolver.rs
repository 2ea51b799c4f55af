//! Translation resolution pipeline
//!
//! [`Resolver`] answers `translate(locale, key)` by layering cached remote
//! bundles over the host's local translations:
//!
//! 1. the remote bundle for the locale is served from the cache, or fetched on
//!    a miss
//! 2. it is deep-merged over the local tree, remote values winning
//! 3. the key is looked up in the merged tree
//! 4. on a miss the host's own `translate` gets a turn
//! 5. anything still unresolved becomes `translation missing: {locale}.{key}`

use std::sync::{
    Arc,
    PoisonError,
    RwLock,
    Weak,
};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::bundle::TranslationBundle;
use crate::cache::{
    CacheError,
    TranslationCache,
};
use crate::config::BackendSettings;
use crate::local::{
    LocalLookup,
    LookupError,
};
use crate::remote::{
    RemoteClient,
    RemoteError,
};
use crate::types::{
    Locale,
    TranslationKey,
};

/// Errors that can end a resolution before a translation is found.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Neither the merged tree nor the local fallback chain has the key
    #[error(transparent)]
    Missing(#[from] LookupError),
    /// The remote answered with something that is not a translation bundle
    #[error("remote translations for {locale} are unusable: {source}")]
    Remote {
        locale: Locale,
        #[source]
        source: RemoteError,
    },
}

/// Errors raised while building a [`Resolver`] from settings.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Text returned by [`Resolver::translate`] when no translation exists.
#[must_use]
pub fn missing_placeholder(locale: &Locale, key: &TranslationKey) -> String {
    format!("translation missing: {locale}.{key}")
}

/// Remote-over-local translation lookup with a cache in front of the remote.
pub struct Resolver {
    /// Remote translation source
    remote: RemoteClient,
    /// Cache of remote bundles
    cache: TranslationCache,
    /// Host backend
    local: Arc<dyn LocalLookup>,
    /// Key path separator
    separator: String,
    /// Remote and local locales, deduplicated
    available_locales: RwLock<Vec<Locale>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("remote", &self.remote)
            .field("cache", &self.cache)
            .field("local", &"<dyn LocalLookup>")
            .field("separator", &self.separator)
            .field("available_locales", &self.available_locales)
            .finish()
    }
}

impl Resolver {
    /// Builds the remote client and cache from `settings`, then discovers locales.
    ///
    /// # Errors
    /// The HTTP client cannot be built or the redis URL is invalid. Locale
    /// discovery itself never fails construction.
    pub async fn new(
        settings: &BackendSettings,
        local: Arc<dyn LocalLookup>,
    ) -> Result<Self, SetupError> {
        let remote = RemoteClient::new(&settings.base_url, &settings.http)?;
        let cache = TranslationCache::from_settings(&settings.cache)?;
        Ok(Self::with_parts(remote, cache, local, &settings.key_separator).await)
    }

    /// Like [`Self::new`], but shared and with the periodic locale refresh
    /// started when `localeRefreshIntervalSecs` is set.
    ///
    /// # Errors
    /// Same as [`Self::new`].
    pub async fn shared(
        settings: &BackendSettings,
        local: Arc<dyn LocalLookup>,
    ) -> Result<Arc<Self>, SetupError> {
        let resolver = Arc::new(Self::new(settings, local).await?);
        if let Some(secs) = settings.locale_refresh_interval_secs {
            resolver.spawn_locale_refresh(Duration::from_secs(secs));
        }
        Ok(resolver)
    }

    /// Assembles a resolver from ready-made parts and discovers locales.
    pub async fn with_parts(
        remote: RemoteClient,
        cache: TranslationCache,
        local: Arc<dyn LocalLookup>,
        separator: &str,
    ) -> Self {
        let resolver = Self {
            remote,
            cache,
            local,
            separator: separator.to_string(),
            available_locales: RwLock::new(Vec::new()),
        };
        resolver.refresh_locales().await;
        resolver
    }

    /// Remote locales followed by local ones, without duplicates.
    #[must_use]
    pub fn available_locales(&self) -> Vec<Locale> {
        self.available_locales.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Re-runs locale discovery and returns the new set.
    ///
    /// An unreachable remote leaves only the local locales.
    pub async fn refresh_locales(&self) -> Vec<Locale> {
        let mut locales = self.remote.fetch_locale_index().await;
        for locale in self.local.available_locales() {
            if !locales.contains(&locale) {
                locales.push(locale);
            }
        }
        tracing::debug!(count = locales.len(), "Available locales updated");

        self.available_locales
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clone_from(&locales);
        locales
    }

    /// Refreshes locales every `interval` until the resolver is dropped.
    pub fn spawn_locale_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let resolver: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick completes immediately; construction already discovered
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(resolver) = resolver.upgrade() else {
                    tracing::debug!("Resolver dropped, stopping locale refresh");
                    break;
                };
                resolver.refresh_locales().await;
            }
        })
    }

    /// The remote bundle for `locale` merged over the local tree.
    ///
    /// Without remote data this is the local tree unchanged, or an empty tree
    /// when the host has none either.
    ///
    /// # Errors
    /// [`ResolveError::Remote`] when the remote sent an unusable bundle.
    pub async fn available_translations(
        &self,
        locale: &Locale,
    ) -> Result<TranslationBundle, ResolveError> {
        let remote = self
            .cache
            .fetch_or_compute(locale, || self.remote.fetch_translations(locale))
            .await
            .map_err(|source| ResolveError::Remote { locale: locale.clone(), source })?;

        let mut merged = self.local.translations(locale).unwrap_or_default();
        if let Some(remote) = remote {
            merged.deep_merge(remote);
        }
        Ok(merged)
    }

    /// Resolves `key`, keeping the reason when nothing is found.
    ///
    /// # Errors
    /// - [`ResolveError::Missing`] when no layer has the key
    /// - [`ResolveError::Remote`] when the remote bundle is unusable
    pub async fn lookup(&self, locale: &Locale, key: &TranslationKey) -> Result<String, ResolveError> {
        let bundle = self.available_translations(locale).await?;
        if let Some(text) = bundle.get(key, &self.separator) {
            return Ok(text.to_string());
        }

        tracing::trace!(%locale, %key, "Not in merged tree, asking local backend");
        Ok(self.local.translate(locale, key)?)
    }

    /// Resolves `key` to display text. Never fails.
    ///
    /// `key` may be given in any accepted spelling (`hello`, `:hello`).
    pub async fn translate(&self, locale: &Locale, key: &str) -> String {
        let key = TranslationKey::new(key);
        match self.lookup(locale, &key).await {
            Ok(text) => text,
            Err(ResolveError::Missing(e)) => {
                tracing::debug!(error = %e, "Translation missing");
                missing_placeholder(locale, &key)
            }
            Err(e) => {
                tracing::warn!(%locale, %key, error = %e, "Translation failed");
                missing_placeholder(locale, &key)
            }
        }
    }

    /// Replaces the cached remote bundle for `locale`, e.g. after a push from
    /// the translation source.
    ///
    /// # Errors
    /// The cache store rejected the write.
    pub async fn store_translations(
        &self,
        locale: &Locale,
        bundle: &TranslationBundle,
    ) -> Result<(), CacheError> {
        self.cache.write(locale, bundle).await
    }

    /// Fetches every available locale into the cache concurrently.
    ///
    /// Returns how many locales have remote translations.
    pub async fn warm_up(&self) -> usize {
        let locales = self.available_locales();
        let fetches = locales.iter().map(|locale| {
            self.cache.fetch_or_compute(locale, move || self.remote.fetch_translations(locale))
        });

        let warmed = futures::future::join_all(fetches)
            .await
            .into_iter()
            .filter(|result| matches!(result, Ok(Some(_))))
            .count();
        tracing::info!(warmed, total = locales.len(), "Warmed remote translation cache");
        warmed
    }

    #[must_use]
    pub const fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    #[must_use]
    pub const fn remote(&self) -> &RemoteClient {
        &self.remote
    }
}
