use crate::config::rd::RD;
use anyhow::Result;
use async_trait::async_trait;
use bb8_redis::redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The slice of the cache protocol this service depends on. The process holds
/// one `RD`-backed instance; tests substitute an in-memory one.
///
/// "No such key" is not an error: `get` yields `None`, `zcard` yields 0 and
/// `zrevrange` yields an empty list. An `Err` always means transport trouble.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()>;
    async fn zrem(&self, key: &str, member: &str) -> Result<()>;
    async fn zcard(&self, key: &str) -> Result<i64>;
    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;
}

pub async fn get_object<T>(cache: &dyn Cache, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    match cache.get(key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub async fn set_object<T>(cache: &dyn Cache, key: &str, value: &T) -> Result<()>
where
    T: Serialize + Sync,
{
    let json = serde_json::to_string(value)?;
    cache.set(key, &json).await
}

#[async_trait]
impl Cache for RD {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.zrem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn zcard(&self, key: &str) -> Result<i64> {
        let mut conn = self.pool.get().await?;
        let count: i64 = conn.zcard(key).await?;
        Ok(count)
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let members: Vec<String> = conn.zrevrange(key, start as isize, stop as isize).await?;
        Ok(members)
    }
}
