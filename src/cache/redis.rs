//! Redis-backed cache client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;

use super::Cache;

/// Cache backed by a Redis server.
///
/// Uses a multiplexed connection, so concurrent requests share a single
/// TCP connection.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// Connect to Redis and verify the server responds to PING.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("Invalid Redis URL: {}", redis_url))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .context("Redis PING failed")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .with_context(|| format!("Failed to SET {}", key))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")?;
        let value: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("Failed to GET {}", key))?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")?;
        conn.del::<_, ()>(key)
            .await
            .with_context(|| format!("Failed to DEL {}", key))?;
        Ok(())
    }
}
