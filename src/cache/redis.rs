//! Redis store using a bb8 connection pool.
//!
//! Each entry is a hash `{value, stored_at}` under `<prefix>:entry:<key>`;
//! the in-flight marker is a separate `<prefix>:lock:<key>` string set with
//! `NX EX`, so fetch deduplication also holds between server processes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use jiff::Timestamp;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};

use crate::cache::{CacheEntry, CacheError, CacheStore, Clock};
use crate::config::settings::RedisCacheConfig;

type RedisPool = Pool<Client>;

/// Redis-based store with bb8 connection pool.
pub struct RedisStore {
    pool: RedisPool,
    key_prefix: String,
    retention_seconds: u64,
    lease_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl RedisStore {
    pub async fn new(
        config: &RedisCacheConfig,
        cache_name: &str,
        lease: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout))
            .build(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            key_prefix: format!("{}:{}", config.key_prefix, cache_name),
            retention_seconds: config.retention_seconds,
            lease_seconds: lease.as_secs().max(1),
            clock,
        })
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}:entry:{}", self.key_prefix, key)
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}:lock:{}", self.key_prefix, key)
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

fn op_error(e: RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let (fields, fetching): (Vec<Option<Vec<u8>>>, bool) = redis::pipe()
            .cmd("HMGET")
            .arg(self.entry_key(key))
            .arg("value")
            .arg("stored_at")
            .cmd("EXISTS")
            .arg(self.lock_key(key))
            .query_async(conn_ref)
            .await
            .map_err(op_error)?;

        let mut fields = fields.into_iter();
        let (Some(Some(value)), Some(Some(stored_at))) = (fields.next(), fields.next()) else {
            return Ok(None);
        };

        let stored_at = std::str::from_utf8(&stored_at)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|ms| Timestamp::from_millisecond(ms).ok())
            .ok_or_else(|| CacheError::Serialization(format!("invalid stored_at for {}", key)))?;

        Ok(Some(CacheEntry {
            value,
            stored_at,
            fetching,
        }))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let entry_key = self.entry_key(key);
        let stored_at = self.clock.now().as_millisecond();

        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&entry_key)
            .arg("value")
            .arg(value)
            .arg("stored_at")
            .arg(stored_at)
            .ignore()
            .cmd("EXPIRE")
            .arg(&entry_key)
            .arg(self.retention_seconds)
            .ignore()
            .cmd("DEL")
            .arg(self.lock_key(key))
            .ignore()
            .query_async::<()>(conn_ref)
            .await
            .map_err(op_error)
    }

    async fn try_begin_fetch(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let reply: Option<String> = redis::cmd("SET")
            .arg(self.lock_key(key))
            .arg(self.clock.now().as_millisecond())
            .arg("NX")
            .arg("EX")
            .arg(self.lease_seconds)
            .query_async(conn_ref)
            .await
            .map_err(op_error)?;

        Ok(reply.is_some())
    }

    async fn end_fetch(&self, key: &str) -> Result<(), CacheError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        redis::cmd("DEL")
            .arg(self.lock_key(key))
            .query_async::<()>(conn_ref)
            .await
            .map_err(op_error)
    }
}
