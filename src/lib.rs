//! i18n-http-backend
//!
//! Remote HTTP translations layered over a local i18n backend, with a cache in
//! front of the remote.

pub mod bundle;
pub mod cache;
pub mod config;
pub mod local;
pub mod logging;
pub mod remote;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use bundle::{
    TranslationBundle,
    TranslationNode,
};
pub use local::{
    LocalLookup,
    StaticLookup,
};
pub use resolver::Resolver;
pub use types::{
    Locale,
    TranslationKey,
};
