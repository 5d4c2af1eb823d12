use crate::error::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

const REDIS_PORT: u16 = 6379;

/// Configuration for a disposable Redis server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisServerConfig {
    #[builder(default = "8.6.0".to_string(), setter(into))]
    pub tag: String,
    /// Enables `requirepass` on the server.
    #[builder(default, setter(into, strip_option))]
    pub password: Option<String>,
}

impl Default for RedisServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A Redis server running in a container for the lifetime of the value.
pub struct RedisServer {
    container: ContainerAsync<GenericImage>,
    password: Option<String>,
}

impl RedisServer {
    /// Starts an unauthenticated server with the default image.
    pub async fn start() -> Result<Self> {
        Self::new(RedisServerConfig::default()).await
    }

    pub async fn new(config: RedisServerConfig) -> Result<Self> {
        let mut cmd = vec!["redis-server".to_string()];
        if let Some(password) = &config.password {
            cmd.push("--requirepass".to_string());
            cmd.push(password.clone());
        }

        let container = GenericImage::new("redis", &config.tag)
            .with_exposed_port(REDIS_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .with_cmd(cmd)
            .start()
            .await?;

        Ok(Self {
            container,
            password: config.password,
        })
    }

    pub async fn host(&self) -> Result<String> {
        let host = self.container.get_host().await?.to_string();
        // Use IPv4 explicitly to avoid IPv6 resolution issues
        Ok(if host == "localhost" {
            "127.0.0.1".to_string()
        } else {
            host
        })
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(REDIS_PORT).await?)
    }

    /// `host:port` as seen from the test process.
    pub async fn addr(&self) -> Result<String> {
        Ok(format!("{}:{}", self.host().await?, self.port().await?))
    }

    /// Connection URL for database `db`, including the password if any.
    pub async fn url(&self, db: i64) -> Result<String> {
        let auth = match &self.password {
            Some(password) => format!(":{password}@"),
            None => String::new(),
        };
        Ok(format!("redis://{auth}{}/{db}", self.addr().await?))
    }

    /// Reads a key directly, bypassing any pool under test.
    pub async fn raw_get(&self, db: i64, key: &str) -> Result<Option<Vec<u8>>> {
        let client = redis::Client::open(self.url(db).await?)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        Ok(redis::cmd("GET").arg(key).query_async(&mut conn).await?)
    }

    /// Remaining TTL of a key in seconds, as reported by `TTL`.
    pub async fn raw_ttl(&self, db: i64, key: &str) -> Result<i64> {
        let client = redis::Client::open(self.url(db).await?)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        Ok(redis::cmd("TTL").arg(key).query_async(&mut conn).await?)
    }
}
