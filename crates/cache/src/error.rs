use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend is unavailable: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Failed to (de)serialize a cached value: {0}")]
    Serialization(#[from] serde_json::Error),
}
