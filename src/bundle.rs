//! Translation bundle tree

use std::collections::{
    BTreeMap,
    HashMap,
};

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use thiserror::Error;

use crate::types::TranslationKey;

/// Raised when a JSON document cannot be turned into a bundle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// The document root must be an object of keys.
    #[error("expected a JSON object at the bundle root, found {0}")]
    NotAnObject(&'static str),
}

/// One entry in a bundle: a translated string or a nested group of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslationNode {
    Leaf(String),
    Tree(TranslationBundle),
}

/// Every translation for one locale, as a tree keyed by path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationBundle {
    entries: BTreeMap<String, TranslationNode>,
}

/// Human readable name of a JSON value's type, for error messages.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl TranslationNode {
    /// Converts any JSON value into a node.
    ///
    /// Arrays become trees keyed by index, other scalars keep their JSON text.
    fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Leaf(s),
            Value::Object(map) => Self::Tree(TranslationBundle::from_map(map)),
            Value::Array(items) => Self::Tree(TranslationBundle {
                entries: items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), Self::from_json(item)))
                    .collect(),
            }),
            other => Self::Leaf(other.to_string()),
        }
    }
}

impl TranslationBundle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bundle from a parsed JSON document.
    ///
    /// # Examples
    /// ```
    /// use serde_json::json;
    /// use i18n_http_backend::bundle::TranslationBundle;
    ///
    /// let bundle = TranslationBundle::from_json(json!({
    ///     "common": { "hello": "Hello" }
    /// }))
    /// .unwrap();
    ///
    /// assert_eq!(bundle.get(&"common.hello".into(), "."), Some("Hello"));
    /// ```
    pub fn from_json(value: Value) -> Result<Self, BundleError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(BundleError::NotAnObject(json_kind(&other))),
        }
    }

    /// Builds a bundle from a JSON object.
    fn from_map(map: serde_json::Map<String, Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(key, value)| (key, TranslationNode::from_json(value)))
                .collect(),
        }
    }

    /// Inserts a leaf or subtree directly under `key`.
    pub fn insert(&mut self, key: impl Into<String>, node: TranslationNode) {
        self.entries.insert(key.into(), node);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Overlays `overlay` onto this bundle.
    ///
    /// Values from `overlay` win on collision. Two subtrees under the same key
    /// are merged recursively; keys only present here are kept.
    pub fn deep_merge(&mut self, overlay: Self) {
        for (key, incoming) in overlay.entries {
            match incoming {
                TranslationNode::Tree(subtree) => {
                    if let Some(TranslationNode::Tree(existing)) = self.entries.get_mut(&key) {
                        existing.deep_merge(subtree);
                    } else {
                        self.entries.insert(key, TranslationNode::Tree(subtree));
                    }
                }
                leaf @ TranslationNode::Leaf(_) => {
                    self.entries.insert(key, leaf);
                }
            }
        }
    }

    /// Returns the leaf text stored at `key`.
    ///
    /// A key naming a subtree is not a translation and yields `None`. A literal
    /// top-level entry containing the separator takes precedence over the path
    /// walk.
    #[must_use]
    pub fn get(&self, key: &TranslationKey, separator: &str) -> Option<&str> {
        if let Some(TranslationNode::Leaf(text)) = self.entries.get(key.as_str()) {
            return Some(text.as_str());
        }

        let mut segments = key.segments(separator).peekable();
        let mut current = self;
        while let Some(segment) = segments.next() {
            match (current.entries.get(segment)?, segments.peek()) {
                (TranslationNode::Leaf(text), None) => return Some(text.as_str()),
                (TranslationNode::Tree(subtree), Some(_)) => current = subtree,
                _ => return None,
            }
        }
        None
    }

    /// Flattens the tree into a map of separator-joined keys to leaf text.
    #[must_use]
    pub fn flatten(&self, separator: &str) -> HashMap<String, String> {
        let mut result = HashMap::new();
        self.flatten_into(separator, None, &mut result);
        result
    }

    /// Recursive worker for [`Self::flatten`].
    fn flatten_into(
        &self,
        separator: &str,
        prefix: Option<&str>,
        result: &mut HashMap<String, String>,
    ) {
        for (key, node) in &self.entries {
            let full_key = prefix.map_or_else(|| key.clone(), |p| format!("{p}{separator}{key}"));
            match node {
                TranslationNode::Leaf(text) => {
                    result.insert(full_key, text.clone());
                }
                TranslationNode::Tree(subtree) => {
                    subtree.flatten_into(separator, Some(&full_key), result);
                }
            }
        }
    }
}
