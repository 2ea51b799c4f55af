use thiserror::Error;

/// Defines errors raised by a cache backing store
#[derive(Error, Debug)]
pub enum CacheError {
    /// The networked store rejected a command or dropped the connection
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    /// A stored entry could not be encoded or decoded
    #[error("failed to (de)serialize cached bundle: {0}")]
    Codec(#[from] serde_json::Error),
}
