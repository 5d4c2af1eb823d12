use async_trait::async_trait;
use deadpool_redis::redis::cmd;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::BoxError;
use crate::expiry::{Expiry, DEFAULT_CACHE_TTL};
use crate::{Error, Executor, RedisCommands, Result};

/// Read-through caching of byte payloads, available on every [`Executor`].
///
/// On a miss the producer runs and its payload is written under the key; on
/// a hit the stored bytes are returned and the producer is never called.
///
/// The existence check and the write are separate round-trips, so two
/// callers that miss at the same time will both run the producer and the
/// later write wins. Producers must tolerate that.
#[async_trait]
pub trait ReadThroughCache: Executor {
    /// Returns the cached payload for `key`, computing and storing it for
    /// [`DEFAULT_CACHE_TTL`] on a miss.
    async fn get_or_compute<F, Fut, E>(&self, key: &str, produce: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<Vec<u8>, E>> + Send,
        E: Into<BoxError> + Send,
    {
        self.get_or_compute_for(key, DEFAULT_CACHE_TTL, produce).await
    }

    /// Like [`get_or_compute`](ReadThroughCache::get_or_compute) with a
    /// caller-supplied TTL.
    async fn get_or_compute_for<F, Fut, E>(&self, key: &str, ttl: Duration, produce: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<Vec<u8>, E>> + Send,
        E: Into<BoxError> + Send,
    {
        self.get_or_compute_with_expiry(key, move || async move {
            produce().await.map(|payload| (payload, Expiry::Ttl(ttl)))
        })
        .await
    }

    /// Read-through where the producer decides the expiry of its own payload,
    /// for data that carries its own deadline.
    async fn get_or_compute_with_expiry<F, Fut, E>(&self, key: &str, produce: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<(Vec<u8>, Expiry), E>> + Send,
        E: Into<BoxError> + Send,
    {
        if self.exists(key).await? {
            trace!(key, "read-through cache hit");
            let cached: Option<Vec<u8>> = self.query(cmd("GET").arg(key)).await?;
            return cached.ok_or_else(|| Error::MissingValue(key.to_string()));
        }

        debug!(key, "read-through cache miss, running producer");
        let (payload, expiry) = produce().await.map_err(|e| Error::Producer(e.into()))?;
        if payload.is_empty() {
            return Err(Error::EmptyPayload(key.to_string()));
        }

        let _: () = self.query(&expiry.set_cmd(key, &payload)).await?;
        debug!(key, ?expiry, bytes = payload.len(), "stored producer payload");
        Ok(payload)
    }
}

impl<E> ReadThroughCache for E where E: Executor + ?Sized {}
