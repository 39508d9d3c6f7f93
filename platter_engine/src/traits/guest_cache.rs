use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A small key-value store for short-lived guest state: merge tokens and guest carts.
///
/// Implementations must be safe to share between request handlers and event consumers, so the trait is object-safe
/// and is normally held as an `Arc<dyn GuestCache>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuestCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing anything already there. With a `ttl`, the entry disappears once it
    /// elapses.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Reads and removes the entry in one step. Of several concurrent callers, at most one receives the value.
    async fn take(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("The cache is unavailable. {0}")]
    Unavailable(String),
    #[error("The cached value for {key} could not be read. {reason}")]
    CorruptValue { key: String, reason: String },
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}
