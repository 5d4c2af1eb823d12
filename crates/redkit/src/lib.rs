//! Command helpers, connection pooling and read-through caching on top of
//! the `redis` client.
//!
//! Everything is layered on the [`Executor`] trait: a [`RedisPool`] runs
//! commands on pooled connections, and the [`RedisCommands`] and
//! [`ReadThroughCache`] helpers are available on any executor.
//!
//! ```rust,no_run
//! use redkit::{ConnectTarget, PoolOptions, ReadThroughCache, RedisCommands, RedisPool};
//!
//! # async fn example() -> redkit::Result<()> {
//! let target = ConnectTarget::builder()
//!     .addr("127.0.0.1:6379")
//!     .password("secret")
//!     .db(2)
//!     .build();
//! let pool = RedisPool::connect(&target, PoolOptions::default()).await?;
//!
//! pool.hset("wallet:7", "coin", 100).await?;
//! let coin: i64 = pool.hget("wallet:7", "coin").await?;
//!
//! let report = pool
//!     .get_or_compute("report:daily", || async {
//!         Ok::<_, std::io::Error>(b"expensive".to_vec())
//!     })
//!     .await?;
//! # let _ = (coin, report);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod commands;
pub mod error;
pub mod executor;
pub mod expiry;
pub mod pool;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::ReadThroughCache;
pub use commands::RedisCommands;
pub use error::{Error, Result};
pub use executor::Executor;
pub use expiry::{Expiry, DEFAULT_CACHE_TTL};
pub use pool::{ConnectTarget, PoolOptions, RedisPool, TlsMode};
pub use registry::{global, PoolRegistry, DEFAULT_POOL};

/// Re-export of the client crate, for building raw commands and decoding replies.
pub use deadpool_redis::redis;
