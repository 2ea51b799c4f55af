//! Helpers shared by unit test modules.
#![cfg(test)]

use serde_json::Value;

use crate::bundle::TranslationBundle;
use crate::local::StaticLookup;

/// Builds a bundle from a JSON object literal.
///
/// # Panics
/// If `value` is not a JSON object.
#[allow(clippy::expect_used)]
pub(crate) fn bundle(value: Value) -> TranslationBundle {
    TranslationBundle::from_json(value).expect("test bundle must be a JSON object")
}

/// Builds a local lookup from `(locale, json)` pairs.
pub(crate) fn static_lookup(entries: Vec<(&str, Value)>) -> StaticLookup {
    entries
        .into_iter()
        .fold(StaticLookup::new(), |lookup, (locale, value)| lookup.with_bundle(locale, bundle(value)))
}
