//! Remote bundle cache
mod error;
mod store;
mod translations;

pub use error::CacheError;
pub use store::{
    CacheStore,
    MemoryStore,
    RedisStore,
};
pub use translations::{
    DEFAULT_TTL,
    KEY_NAMESPACE,
    TranslationCache,
};
