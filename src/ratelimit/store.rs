//! Counter store backends for rate limit window records.
//!
//! The store holds one sliding-window record per caller identity. Two
//! backends are provided: Redis for shared enforcement across instances, and
//! an in-memory map for single-node deployments and tests.

use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::time::timeout;

/// Bound on the initial store connection at startup.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from a counter store operation.
///
/// Store faults are transient by policy: the limiter maps them to an admit
/// decision instead of failing the request.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The operation did not complete within the configured bound
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The store rejected the operation or the connection failed
    #[error("store unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),
}

/// Shared counter store holding one window record per caller identity.
///
/// The four primitives are independent round trips; `RateLimiter::evaluate`
/// composes them into the purge / count / insert / expire sequence.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Remove entries with a score strictly below `threshold`.
    async fn prune(&self, key: &str, threshold: u64) -> Result<(), StoreError>;

    /// Count the remaining entries for `key`.
    async fn count(&self, key: &str) -> Result<u64, StoreError>;

    /// Insert an entry scored at `score`.
    async fn insert(&self, key: &str, score: u64) -> Result<(), StoreError>;

    /// Set the record's time-to-live, refreshing any previous value.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;
}

/// Redis-backed counter store using one sorted set per caller identity.
///
/// Every operation is bounded by `op_timeout`, independent of the client's
/// request timeout, so a degraded store cannot stall the request path.
pub struct RedisCounterStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCounterStore {
    /// Connect to the store at `url`.
    ///
    /// Fails if the server is unreachable; callers are expected to fall back
    /// to a disabled limiter rather than abort startup.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = match timeout(CONNECT_TIMEOUT, ConnectionManager::new(client)).await {
            Ok(conn) => conn?,
            Err(_) => return Err(StoreError::Timeout(CONNECT_TIMEOUT)),
        };

        Ok(Self { conn, op_timeout })
    }

    /// Run a store call under the per-operation timeout.
    async fn bounded<T>(
        &self,
        op: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, StoreError> {
        match timeout(self.op_timeout, op).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn prune(&self, key: &str, threshold: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            // Exclusive upper bound: entries scored exactly at the threshold
            // are still inside the window.
            redis::cmd("ZREMRANGEBYSCORE")
                .arg(key)
                .arg("-inf")
                .arg(format!("({}", threshold))
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }

    async fn count(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("ZCARD").arg(key).query_async::<u64>(&mut conn).await
        })
        .await
    }

    async fn insert(&self, key: &str, score: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("ZADD")
                .arg(key)
                .arg(score)
                .arg(score)
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl.as_secs() as i64)
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }
}

/// One caller's window record in the in-memory store.
#[derive(Default)]
struct WindowRecord {
    /// Admitted-request timestamps, oldest first
    timestamps: VecDeque<u64>,
    /// Wall-clock deadline after which the record is discarded
    expires_at: Option<Instant>,
}

/// In-memory counter store for single-node deployments and tests.
///
/// The map's sharded locking serializes operations per key. Expiry is
/// enforced lazily: a record whose deadline has passed is dropped the next
/// time its key is touched.
#[derive(Default)]
pub struct MemoryCounterStore {
    records: DashMap<String, WindowRecord>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live window records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    fn drop_if_expired(&self, key: &str) {
        self.records.remove_if(key, |_, record| {
            matches!(record.expires_at, Some(deadline) if deadline <= Instant::now())
        });
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn prune(&self, key: &str, threshold: u64) -> Result<(), StoreError> {
        self.drop_if_expired(key);

        if let Some(mut record) = self.records.get_mut(key) {
            while let Some(&ts) = record.timestamps.front() {
                if ts < threshold {
                    record.timestamps.pop_front();
                } else {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u64, StoreError> {
        self.drop_if_expired(key);

        Ok(self
            .records
            .get(key)
            .map(|record| record.timestamps.len() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, key: &str, score: u64) -> Result<(), StoreError> {
        self.records
            .entry(key.to_string())
            .or_default()
            .timestamps
            .push_back(score);

        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        if let Some(mut record) = self.records.get_mut(key) {
            record.expires_at = Some(Instant::now() + ttl);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = MemoryCounterStore::new();

        store.insert("rate_limit:a", 100).await.unwrap();
        store.insert("rate_limit:a", 110).await.unwrap();

        assert_eq!(store.count("rate_limit:a").await.unwrap(), 2);
        assert_eq!(store.count("rate_limit:b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_removes_only_stale_entries() {
        let store = MemoryCounterStore::new();

        store.insert("rate_limit:a", 100).await.unwrap();
        store.insert("rate_limit:a", 150).await.unwrap();
        store.insert("rate_limit:a", 160).await.unwrap();

        store.prune("rate_limit:a", 150).await.unwrap();

        // 100 is below the threshold; 150 sits exactly on it and stays.
        assert_eq!(store.count("rate_limit:a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prune_is_idempotent() {
        let store = MemoryCounterStore::new();

        store.insert("rate_limit:a", 100).await.unwrap();
        store.insert("rate_limit:a", 200).await.unwrap();

        store.prune("rate_limit:a", 150).await.unwrap();
        let first = store.count("rate_limit:a").await.unwrap();

        store.prune("rate_limit:a", 150).await.unwrap();
        let second = store.count("rate_limit:a").await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_expired_record_is_dropped_on_access() {
        let store = MemoryCounterStore::new();

        store.insert("rate_limit:a", 100).await.unwrap();
        store.expire("rate_limit:a", Duration::ZERO).await.unwrap();

        assert_eq!(store.count("rate_limit:a").await.unwrap(), 0);
        assert_eq!(store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_expire_on_missing_key_is_noop() {
        let store = MemoryCounterStore::new();

        store.expire("rate_limit:ghost", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.record_count(), 0);
    }
}
