//! Redis 读穿缓存。缓存不可用时只记日志，调用方回落到数据库。

use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

pub fn expert_key(expert_id: Uuid) -> String {
    format!("expert:id:{}", expert_id)
}

#[derive(Clone)]
pub struct JsonCache {
    redis: Arc<RedisClient>,
    ttl_secs: u64,
}

impl JsonCache {
    pub fn new(redis: Arc<RedisClient>, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("Cache unavailable: {}", e);
                return None;
            }
        };

        let cached: redis::RedisResult<Option<String>> = conn.get(key).await;
        match cached {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => {
                    tracing::debug!("Cache hit: {}", key);
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!("Dropping undecodable cache entry {}: {}", key, e);
                    let _: redis::RedisResult<()> = conn.del(key).await;
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("Cache miss: {}", key);
                None
            }
            Err(e) => {
                tracing::debug!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        if let Ok(mut conn) = self.redis.get_multiplexed_async_connection().await {
            let result: redis::RedisResult<()> = conn.set_ex(key, json, self.ttl_secs).await;
            if let Err(e) = result {
                tracing::debug!("Cache write failed for {}: {}", key, e);
            }
        }
    }

    pub async fn invalidate(&self, key: &str) {
        if let Ok(mut conn) = self.redis.get_multiplexed_async_connection().await {
            let result: redis::RedisResult<()> = conn.del(key).await;
            if let Err(e) = result {
                tracing::warn!("Cache invalidation failed for {}: {}", key, e);
            }
        }
    }
}
