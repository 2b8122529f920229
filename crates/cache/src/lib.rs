//! Key-value stores with per-key TTL: the only shared state of the trigger
//! engine.
//!
//! - [`KvStore`]: the narrow interface the engine consumes
//! - [`MemoryStore`]: in-process store, coordinates threads/tasks of one process
//! - [`RedisStore`]: shared store, coordinates every process pointed at it

pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod traits;

use std::sync::Arc;

use trigger_core::CacheConfig;

pub use error::CacheError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use traits::KvStore;

/// Build the store selected by configuration.
pub fn store_from_config(config: &CacheConfig) -> Result<Arc<dyn KvStore>, CacheError> {
    match config.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        Some(url) => {
            tracing::info!("using redis run-state store");
            Ok(Arc::new(RedisStore::connect(url)?))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => Err(CacheError::Unsupported(
            "redis_url is set but the `redis` feature is disabled".into(),
        )),
        None => {
            tracing::info!("using in-process run-state store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
