use async_trait::async_trait;
use deadpool_redis::redis::{Cmd, Value};
use deadpool_redis::{Config, Connection, PoolConfig, Runtime, Status, Timeouts};
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

use crate::executor::{command_name, Executor};
use crate::{Error, Result};

/// Transport security for a [`ConnectTarget`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain TCP (`redis://`).
    #[default]
    Disabled,
    /// TLS with certificate verification (`rediss://`).
    Enabled,
    /// TLS without certificate verification.
    Insecure,
}

/// Where a pool dials: address, auth and database index.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct ConnectTarget {
    /// `host:port` of the Redis server.
    #[builder(setter(into))]
    pub addr: String,
    /// Password sent with `AUTH`. Empty strings are treated as no password.
    #[builder(default, setter(into, strip_option))]
    pub password: Option<String>,
    /// Database selected after connecting.
    #[builder(default = 0)]
    pub db: i64,
    #[builder(default)]
    pub tls: TlsMode,
}

impl ConnectTarget {
    /// Plain-TCP target for `addr` using database 0 and no password.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::builder().addr(addr).build()
    }

    /// Renders the target as a connection URL understood by the client.
    pub fn url(&self) -> String {
        let scheme = match self.tls {
            TlsMode::Disabled => "redis",
            TlsMode::Enabled | TlsMode::Insecure => "rediss",
        };
        let auth = match self.password.as_deref() {
            Some(password) if !password.is_empty() => {
                format!(":{}@", urlencoding::encode(password))
            }
            _ => String::new(),
        };
        let fragment = match self.tls {
            TlsMode::Insecure => "#insecure",
            _ => "",
        };
        format!("{scheme}://{auth}{}/{}{fragment}", self.addr, self.db)
    }
}

/// Pool sizing and timeout options.
///
/// ```rust
/// use redkit::PoolOptions;
/// use std::time::Duration;
///
/// let options = PoolOptions::builder()
///     .max_active(200)
///     .idle_timeout(Duration::from_secs(60))
///     .build();
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct PoolOptions {
    /// Upper bound on open connections.
    #[builder(default = 100)]
    pub max_active: usize,
    /// Idle connections kept after a prune.
    #[builder(default = 50)]
    pub max_idle: usize,
    /// Idle connections unused for longer than this are closed.
    #[builder(default = Duration::from_secs(300))]
    pub idle_timeout: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub connect_timeout: Duration,
    /// Applies to every command round-trip.
    #[builder(default = Duration::from_secs(10))]
    pub response_timeout: Duration,
    /// How long a checkout waits for a free connection. Zero fails fast.
    #[builder(default = Duration::ZERO)]
    pub wait_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PoolOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_active == 0 {
            return Err(Error::InvalidOptions(
                "max_active must be at least 1".to_string(),
            ));
        }
        if self.max_idle > self.max_active {
            return Err(Error::InvalidOptions(format!(
                "max_idle ({}) cannot exceed max_active ({})",
                self.max_idle, self.max_active
            )));
        }
        Ok(())
    }

    fn pool_config(&self) -> PoolConfig {
        let mut config = PoolConfig::new(self.max_active);
        config.timeouts = Timeouts {
            wait: Some(self.wait_timeout),
            create: Some(self.connect_timeout),
            recycle: Some(self.response_timeout),
        };
        config
    }
}

/// A pooled Redis client.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Clone)]
pub struct RedisPool {
    pool: deadpool_redis::Pool,
    options: PoolOptions,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .field("options", &self.options)
            .finish()
    }
}

impl RedisPool {
    /// Builds a pool without dialing. Connections are opened on first use.
    pub fn new(target: &ConnectTarget, options: PoolOptions) -> Result<Self> {
        options.validate()?;

        let config = Config {
            pool: Some(options.pool_config()),
            ..Config::from_url(target.url())
        };
        let pool = config.create_pool(Some(Runtime::Tokio1))?;

        debug!(
            addr = %target.addr,
            db = target.db,
            tls = ?target.tls,
            max_active = options.max_active,
            max_idle = options.max_idle,
            "created redis pool"
        );

        Ok(Self { pool, options })
    }

    /// Builds a pool and verifies the server answers `PING`.
    pub async fn connect(target: &ConnectTarget, options: PoolOptions) -> Result<Self> {
        let pool = Self::new(target, options)?;
        if let Err(e) = pool.ping().await {
            warn!(addr = %target.addr, error = %e, "redis server did not answer PING");
            pool.close();
            return Err(e);
        }
        info!(addr = %target.addr, db = target.db, "connected to redis");
        Ok(pool)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut cmd = Cmd::new();
        cmd.arg("PING");
        self.execute(&cmd).await.map(|_| ())
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Current pool size, idle connections and limit.
    pub fn status(&self) -> Status {
        self.pool.status()
    }

    /// Closes the pool. Checked-out connections are dropped when returned.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Checks out a connection for work the helpers do not cover,
    /// such as pipelines or transactions.
    pub async fn connection(&self) -> Result<Connection> {
        self.prune_idle();
        Ok(self.pool.get().await?)
    }

    /// Drops idle connections past `idle_timeout`, then any beyond `max_idle`.
    pub fn prune_idle(&self) -> usize {
        let idle_timeout = self.options.idle_timeout;
        let max_idle = self.options.max_idle;
        let mut kept = 0usize;
        let mut removed = 0usize;

        self.pool.retain(|_, metrics| {
            if metrics.last_used() > idle_timeout || kept >= max_idle {
                removed += 1;
                false
            } else {
                kept += 1;
                true
            }
        });

        if removed > 0 {
            debug!(removed, kept, "pruned idle redis connections");
        }
        removed
    }
}

#[async_trait]
impl Executor for RedisPool {
    async fn execute(&self, cmd: &Cmd) -> Result<Value> {
        let mut conn = self.connection().await?;
        trace!(command = %command_name(cmd), "dispatching redis command");

        let timeout = self.options.response_timeout;
        match tokio::time::timeout(timeout, cmd.query_async::<Value>(&mut conn)).await {
            Ok(reply) => Ok(reply?),
            Err(_) => {
                warn!(command = %command_name(cmd), ?timeout, "redis command timed out");
                // The connection may still have a reply in flight; never reuse it.
                let _ = deadpool_redis::Connection::take(conn);
                Err(Error::Timeout(timeout))
            }
        }
    }
}
