use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient};
use tracing::debug;

use super::Cache;

/// Redis 캐시 구현
/// Redis-backed cache
///
/// ConnectionManager 가 재연결을 처리하므로 clone 해서 요청마다 사용
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Redis 연결 생성
    /// redis_url 예: "redis://127.0.0.1:6379"
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = RedisClient::open(redis_url).context("Failed to create Redis client")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        debug!("Connected to Redis at: {}", redis_url);
        Ok(Self { connection })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("Redis GET failed: {}", key))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection.clone();
        match ttl {
            Some(ttl) => {
                // SETEX 는 초 단위, 최소 1초
                let seconds = ttl.as_secs().max(1);
                let _: () = conn
                    .set_ex(key, value, seconds)
                    .await
                    .with_context(|| format!("Redis SETEX failed: {}", key))?;
            }
            None => {
                let _: () = conn
                    .set(key, value)
                    .await
                    .with_context(|| format!("Redis SET failed: {}", key))?;
            }
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(key)
            .await
            .with_context(|| format!("Redis DEL failed: {}", key))?;
        Ok(())
    }
}
