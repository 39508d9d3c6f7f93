//! Implementations of [`GuestCache`](crate::traits::GuestCache).
//!
//! * [`MemoryCache`] keeps everything in process memory. It is the default, and is what the tests use.
//! * `RedisCache` (behind the `redis` feature) shares guest state between server instances.
mod memory;
#[cfg(feature = "redis")]
mod redis_cache;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;
