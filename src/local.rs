//! Local lookup collaborator
//!
//! The host localization system keeps its own translations. The resolver only
//! needs three things from it, captured by [`LocalLookup`].

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::bundle::{
    BundleError,
    TranslationBundle,
};
use crate::types::{
    Locale,
    TranslationKey,
};

/// Raised by a local lookup that has no answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("translation missing: {locale}.{key}")]
    Missing { locale: Locale, key: TranslationKey },
}

/// The host's own translation backend.
pub trait LocalLookup: Send + Sync {
    /// Locales the host has translations for.
    fn available_locales(&self) -> Vec<Locale>;

    /// The host's translation tree for `locale`, if any.
    fn translations(&self, locale: &Locale) -> Option<TranslationBundle>;

    /// The host's own resolution, including any fallback chain it applies.
    ///
    /// # Errors
    /// [`LookupError::Missing`] when nothing in the chain has `key`.
    fn translate(&self, locale: &Locale, key: &TranslationKey) -> Result<String, LookupError>;
}

/// In-memory [`LocalLookup`] with an optional fallback locale chain.
#[derive(Debug, Clone)]
pub struct StaticLookup {
    /// Bundle per locale
    bundles: HashMap<Locale, TranslationBundle>,
    /// Insertion order of `bundles`, for stable locale listing
    order: Vec<Locale>,
    /// Tried in order after the requested locale
    fallbacks: Vec<Locale>,
    /// Key path separator
    separator: String,
}

impl Default for StaticLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticLookup {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bundles: HashMap::new(),
            order: Vec::new(),
            fallbacks: Vec::new(),
            separator: ".".to_string(),
        }
    }

    /// Adds `bundle` for `locale`, deep-merging into any bundle already present.
    #[must_use]
    pub fn with_bundle(mut self, locale: impl Into<Locale>, bundle: TranslationBundle) -> Self {
        let locale = locale.into();
        if let Some(existing) = self.bundles.get_mut(&locale) {
            existing.deep_merge(bundle);
        } else {
            self.order.push(locale.clone());
            self.bundles.insert(locale, bundle);
        }
        self
    }

    /// Adds a bundle parsed from a JSON object.
    ///
    /// # Errors
    /// Returns [`BundleError`] if `value` is not a JSON object.
    pub fn with_json(self, locale: impl Into<Locale>, value: Value) -> Result<Self, BundleError> {
        Ok(self.with_bundle(locale, TranslationBundle::from_json(value)?))
    }

    /// Locales consulted, in order, when the requested locale lacks a key.
    #[must_use]
    pub fn with_fallbacks<I, L>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Locale>,
    {
        self.fallbacks = fallbacks.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl LocalLookup for StaticLookup {
    fn available_locales(&self) -> Vec<Locale> {
        self.order.clone()
    }

    fn translations(&self, locale: &Locale) -> Option<TranslationBundle> {
        self.bundles.get(locale).cloned()
    }

    fn translate(&self, locale: &Locale, key: &TranslationKey) -> Result<String, LookupError> {
        std::iter::once(locale)
            .chain(self.fallbacks.iter().filter(|fallback| *fallback != locale))
            .find_map(|candidate| self.bundles.get(candidate)?.get(key, &self.separator))
            .map(str::to_string)
            .ok_or_else(|| LookupError::Missing { locale: locale.clone(), key: key.clone() })
    }
}
