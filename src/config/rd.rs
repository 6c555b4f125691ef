use bb8_redis::bb8::Pool;
use bb8_redis::RedisConnectionManager;
use std::ops::Deref;
use std::time::Duration;

pub type RedisPool = Pool<RedisConnectionManager>;

pub struct RD {
    pub pool: RedisPool,
}

impl RD {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let redis_manager = RedisConnectionManager::new(url)?;
        let redis_pool = Pool::builder()
            .connection_timeout(Duration::from_secs(5))
            .build(redis_manager)
            .await?;

        // Fail startup, not the first request, when the cache is unreachable.
        {
            let mut conn = redis_pool.get().await?;
            bb8_redis::redis::cmd("PING")
                .query_async::<String>(&mut *conn)
                .await?;
        }

        Ok(RD { pool: redis_pool })
    }
}

impl Deref for RD {
    type Target = RedisPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
