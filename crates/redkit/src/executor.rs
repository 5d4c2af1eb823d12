use async_trait::async_trait;
use deadpool_redis::redis::{Cmd, Value};

use crate::Result;

/// Runs a single Redis command and hands back the raw reply.
///
/// This is the only seam between the helpers in this crate and a live
/// connection. [`RedisCommands`](crate::RedisCommands) and
/// [`ReadThroughCache`](crate::ReadThroughCache) are implemented for every
/// executor, so a pool, a registry entry, or an in-memory fake all expose
/// the same helper surface.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes `cmd` and returns the reply without interpreting it.
    async fn execute(&self, cmd: &Cmd) -> Result<Value>;
}

#[async_trait]
impl<E> Executor for &E
where
    E: Executor + ?Sized,
{
    async fn execute(&self, cmd: &Cmd) -> Result<Value> {
        (**self).execute(cmd).await
    }
}

#[async_trait]
impl<E> Executor for std::sync::Arc<E>
where
    E: Executor + ?Sized,
{
    async fn execute(&self, cmd: &Cmd) -> Result<Value> {
        (**self).execute(cmd).await
    }
}

/// Returns the command name (first argument) for logging.
pub(crate) fn command_name(cmd: &Cmd) -> String {
    use deadpool_redis::redis::Arg;

    match cmd.args_iter().next() {
        Some(Arg::Simple(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        _ => String::new(),
    }
}
