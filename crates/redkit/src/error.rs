use deadpool_redis::redis::RedisError;
use deadpool_redis::{CreatePoolError, PoolError};
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by read-through producers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type alias for redkit results.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("redis command failed: {0}")]
    Redis(#[from] RedisError),
    #[error("failed to check out a pooled connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to build connection pool: {0}")]
    CreatePool(#[from] CreatePoolError),
    #[error("invalid pool options: {0}")]
    InvalidOptions(String),
    #[error("redis command timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection pool '{0}' is not registered")]
    PoolNotFound(String),
    #[error("cache producer failed: {0}")]
    Producer(#[source] BoxError),
    #[error("cache producer returned an empty payload for key '{0}'")]
    EmptyPayload(String),
    #[error("key '{0}' disappeared between existence check and read")]
    MissingValue(String),
}

impl Error {
    /// Returns the underlying Redis error kind, if this is a command error.
    pub fn redis_kind(&self) -> Option<deadpool_redis::redis::ErrorKind> {
        match self {
            Error::Redis(err) => Some(err.kind()),
            _ => None,
        }
    }
}
