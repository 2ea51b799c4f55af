//! Core types used throughout the project.

use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

/// Strips the symbol sigil and surrounding whitespace from a textual identifier.
///
/// Hosts may hand us `:en` or `"en"` for the same thing.
fn canonical(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix(':').unwrap_or(trimmed).trim()
}

/// A locale identifier such as `en` or `pt-BR`.
///
/// Comparison is case-sensitive, matching the remote source's file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(canonical(raw.as_ref()).to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Locale {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A translation key in its canonical dotted form.
///
/// Every accepted spelling of a key (`:hello`, `"hello"`, ` hello `) normalizes
/// to the same value, so lookups never have to probe several encodings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TranslationKey(String);

impl TranslationKey {
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(canonical(raw.as_ref()).to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the key into path segments, dropping empty ones.
    pub fn segments<'a>(&'a self, separator: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.split(separator).filter(|segment| !segment.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TranslationKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TranslationKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
