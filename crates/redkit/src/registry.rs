use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

use crate::{ConnectTarget, Error, PoolOptions, RedisPool, Result};

/// Name of the pool used by single-tenant callers.
pub const DEFAULT_POOL: &str = "default";

/// Named connection pools, one per tenant or database.
///
/// Pools are created on first registration and never removed. Lookups take
/// a shared lock and run concurrently; registration takes the exclusive lock.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: RwLock<HashMap<String, RedisPool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool under `name` and returns it.
    ///
    /// If `name` is already registered the existing pool is returned and
    /// `target` and `options` are ignored. The pool is built lazily; no
    /// connection is opened until the first command.
    pub fn register(
        &self,
        name: &str,
        target: &ConnectTarget,
        options: PoolOptions,
    ) -> Result<RedisPool> {
        if let Some(pool) = self.pools.read().get(name) {
            return Ok(pool.clone());
        }

        let pool = RedisPool::new(target, options)?;

        let mut pools = self.pools.write();
        let entry = pools.entry(name.to_string()).or_insert_with(|| {
            debug!(name, addr = %target.addr, db = target.db, "registered redis pool");
            pool
        });
        Ok(entry.clone())
    }

    /// Looks up the pool registered under `name`.
    pub fn pool(&self, name: &str) -> Result<RedisPool> {
        self.pools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PoolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pools.read().contains_key(name)
    }

    /// Registered pool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registers the pool named [`DEFAULT_POOL`].
    pub fn register_default(&self, target: &ConnectTarget, options: PoolOptions) -> Result<RedisPool> {
        self.register(DEFAULT_POOL, target, options)
    }

    /// The pool named [`DEFAULT_POOL`].
    pub fn default_pool(&self) -> Result<RedisPool> {
        self.pool(DEFAULT_POOL)
    }
}

/// Process-wide registry.
pub fn global() -> &'static PoolRegistry {
    static REGISTRY: OnceLock<PoolRegistry> = OnceLock::new();
    REGISTRY.get_or_init(PoolRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn target(addr: &str) -> ConnectTarget {
        ConnectTarget::new(addr)
    }

    #[tokio::test]
    async fn unknown_name_is_reported() {
        let registry = PoolRegistry::new();
        let err = registry.pool("reports").unwrap_err();
        assert!(matches!(err, Error::PoolNotFound(name) if name == "reports"));
    }

    #[tokio::test]
    async fn first_registration_wins() {
        let registry = PoolRegistry::new();
        let first = PoolOptions::builder().max_active(10).max_idle(5).build();
        let second = PoolOptions::builder().max_active(20).max_idle(5).build();

        registry
            .register("tenant-a", &target("127.0.0.1:6379"), first)
            .unwrap();
        let again = registry
            .register("tenant-a", &target("127.0.0.1:6380"), second)
            .unwrap();

        assert_eq!(again.options().max_active, 10);
        assert_eq!(registry.pool("tenant-a").unwrap().options().max_active, 10);
        assert_eq!(registry.names(), ["tenant-a"]);
    }

    #[tokio::test]
    async fn invalid_options_register_nothing() {
        let registry = PoolRegistry::new();
        let options = PoolOptions::builder().max_active(1).max_idle(4).build();

        assert!(registry
            .register("bad", &target("127.0.0.1:6379"), options)
            .is_err());
        assert!(!registry.contains("bad"));
    }

    #[tokio::test]
    async fn tenants_get_independent_pools() {
        let registry = PoolRegistry::new();
        registry
            .register(
                "orders",
                &ConnectTarget::builder().addr("127.0.0.1:6379").db(1).build(),
                PoolOptions::builder().max_active(8).max_idle(4).build(),
            )
            .unwrap();
        registry
            .register_default(&target("127.0.0.1:6379"), PoolOptions::default())
            .unwrap();

        assert_eq!(registry.names(), [DEFAULT_POOL, "orders"]);
        assert_eq!(registry.pool("orders").unwrap().status().max_size, 8);
        assert_eq!(registry.default_pool().unwrap().status().max_size, 100);
    }

    #[tokio::test]
    async fn concurrent_registration_yields_a_single_pool() {
        let registry = Arc::new(PoolRegistry::new());

        let mut handles = vec![];
        for i in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let options = PoolOptions::builder()
                    .max_active(10 + i)
                    .max_idle(1)
                    .idle_timeout(Duration::from_secs(30))
                    .build();
                registry
                    .register("shared", &ConnectTarget::new("127.0.0.1:6379"), options)
                    .unwrap()
                    .options()
                    .max_active
            }));
        }

        let mut seen = vec![];
        for handle in handles {
            seen.push(handle.await.unwrap());
        }

        seen.dedup();
        assert_eq!(seen.len(), 1, "every caller must get the same pool");
        assert_eq!(registry.names().len(), 1);
    }

    #[test]
    fn global_registry_is_shared() {
        assert!(std::ptr::eq(global(), global()));
    }
}
