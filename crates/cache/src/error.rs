use thiserror::Error;

/// Errors raised by a [`KvStore`](crate::KvStore) backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache lock poisoned: {0}")]
    LockPoisoned(String),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[cfg(feature = "redis")]
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis pool setup failed: {0}")]
    PoolSetup(String),

    #[error("ttl out of range: {0:?}")]
    InvalidTtl(std::time::Duration),

    #[error("unsupported: {0}")]
    Unsupported(String),
}
