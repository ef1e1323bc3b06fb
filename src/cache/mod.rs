//! Transient key-value cache for OAuth sessions and token bundles.
//!
//! The cache is expressed as a capability trait so a different backing
//! store can be substituted in tests without a real network dependency.
//! Production uses Redis; every entry carries a TTL so abandoned flows
//! self-expire.

mod memory;
mod redis;

pub use self::redis::RedisCache;
pub use memory::MemoryCache;

use anyhow::Result;
use async_trait::async_trait;

/// Atomic key operations over the transient store.
///
/// Keys are colon-delimited strings scoped by provider, organization id,
/// and user id. Values are serialized structured records.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store a value under `key`, expiring after `ttl_seconds`.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Fetch the value under `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove the value under `key`. Succeeds whether or not the key exists.
    async fn delete(&self, key: &str) -> Result<()>;
}
