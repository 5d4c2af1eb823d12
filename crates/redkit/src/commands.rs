use async_trait::async_trait;
use deadpool_redis::redis::{cmd, Cmd, ErrorKind, FromRedisValue, Script, ToRedisArgs, Value};
use tracing::{debug, trace, warn};

use crate::{Executor, Result};

/// Keys requested per `SCAN` round-trip in [`RedisCommands::del_pattern`].
pub const SCAN_COUNT: usize = 100;

fn decode<T: FromRedisValue>(value: Value) -> Result<T> {
    Ok(deadpool_redis::redis::from_redis_value(&value)?)
}

fn with_scores(cmd: &mut Cmd, with_scores: bool) {
    if with_scores {
        cmd.arg("WITHSCORES");
    }
}

/// One helper per Redis command, available on every [`Executor`].
///
/// Each helper builds the command array and runs it through
/// [`Executor::execute`]. Replies that the caller may want in different
/// shapes are generic over [`FromRedisValue`]; counts and flags are typed.
#[async_trait]
pub trait RedisCommands: Executor {
    /// Runs an arbitrary command and decodes the reply.
    async fn query<T>(&self, cmd: &Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        decode(self.execute(cmd).await?)
    }

    /// Runs a Lua script against a single key.
    ///
    /// Tries `EVALSHA` first and falls back to `EVAL` when the server has
    /// not cached the script yet.
    async fn eval_script<T, A>(&self, script: &str, key: &str, args: A) -> Result<T>
    where
        T: FromRedisValue + Send,
        A: ToRedisArgs + Send + Sync,
    {
        let hash = Script::new(script).get_hash().to_string();
        let mut evalsha = cmd("EVALSHA");
        evalsha.arg(&hash).arg(1).arg(key).arg(&args);

        match self.execute(&evalsha).await {
            Err(e) if e.redis_kind() == Some(ErrorKind::NoScriptError) => {
                trace!(%hash, "script not cached, falling back to EVAL");
                let mut eval = cmd("EVAL");
                eval.arg(script).arg(1).arg(key).arg(&args);
                decode(self.execute(&eval).await?)
            }
            reply => decode(reply?),
        }
    }

    async fn get<T>(&self, key: &str) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("GET").arg(key)).await
    }

    async fn set<V>(&self, key: &str, value: V) -> Result<()>
    where
        V: ToRedisArgs + Send,
    {
        self.query(cmd("SET").arg(key).arg(value)).await
    }

    /// `SETEX key seconds value`.
    async fn set_ex<V>(&self, key: &str, value: V, seconds: u64) -> Result<()>
    where
        V: ToRedisArgs + Send,
    {
        self.query(cmd("SETEX").arg(key).arg(seconds).arg(value)).await
    }

    /// `SETNX`. Returns whether the key was set.
    async fn set_nx<V>(&self, key: &str, value: V) -> Result<bool>
    where
        V: ToRedisArgs + Send,
    {
        self.query(cmd("SETNX").arg(key).arg(value)).await
    }

    /// `SET key value EX seconds NX`. Returns whether the key was set.
    async fn set_nx_ex<V>(&self, key: &str, value: V, seconds: u64) -> Result<bool>
    where
        V: ToRedisArgs + Send,
    {
        let reply = self
            .execute(cmd("SET").arg(key).arg(value).arg("EX").arg(seconds).arg("NX"))
            .await?;
        Ok(!matches!(reply, Value::Nil))
    }

    /// Returns the number of keys removed.
    async fn del(&self, key: &str) -> Result<i64> {
        self.query(cmd("DEL").arg(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.query(cmd("EXISTS").arg(key)).await
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<()> {
        let _: i64 = self.query(cmd("EXPIRE").arg(key).arg(seconds)).await?;
        Ok(())
    }

    /// `EXPIREAT key unix_seconds`. Returns whether a timeout was set.
    async fn expire_at(&self, key: &str, unix_seconds: i64) -> Result<bool> {
        self.query(cmd("EXPIREAT").arg(key).arg(unix_seconds)).await
    }

    /// `KEYS pattern`. Blocks the server while it walks the keyspace; prefer
    /// [`del_pattern`](RedisCommands::del_pattern) style `SCAN` loops on
    /// large databases.
    ///
    /// Decode to `Vec<Vec<u8>>` when keys may not be valid UTF-8.
    async fn keys<T>(&self, pattern: &str) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("KEYS").arg(pattern)).await
    }

    /// Deletes every key matching `pattern`.
    ///
    /// Walks the keyspace with `SCAN cursor MATCH pattern COUNT n`, deleting
    /// each page as it arrives, until the cursor returns to zero. Keys created
    /// while the walk is running may or may not be removed. Returns the number
    /// of keys deleted.
    async fn del_pattern(&self, pattern: &str) -> Result<usize> {
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            // Keys are binary-safe; decode them as raw bytes.
            let (next, keys): (u64, Vec<Vec<u8>>) = self
                .query(
                    cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_COUNT),
                )
                .await?;

            if !keys.is_empty() {
                let deleted: usize = self.query(cmd("DEL").arg(&keys)).await?;
                trace!(pattern, cursor, deleted, "deleted scan page");
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern, removed, "deleted keys matching pattern");
        Ok(removed)
    }

    async fn incr<T>(&self, key: &str) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("INCR").arg(key)).await
    }

    async fn incr_by<T, D>(&self, key: &str, delta: D) -> Result<T>
    where
        T: FromRedisValue + Send,
        D: ToRedisArgs + Send,
    {
        self.query(cmd("INCRBY").arg(key).arg(delta)).await
    }

    async fn incr_by_float<T>(&self, key: &str, delta: f64) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("INCRBYFLOAT").arg(key).arg(delta)).await
    }

    async fn decr_by<T, D>(&self, key: &str, delta: D) -> Result<T>
    where
        T: FromRedisValue + Send,
        D: ToRedisArgs + Send,
    {
        self.query(cmd("DECRBY").arg(key).arg(delta)).await
    }

    /// Returns the number of fields that were added.
    async fn hset<F, V>(&self, key: &str, field: F, value: V) -> Result<i64>
    where
        F: ToRedisArgs + Send,
        V: ToRedisArgs + Send,
    {
        self.query(cmd("HSET").arg(key).arg(field).arg(value)).await
    }

    async fn hget<T, F>(&self, key: &str, field: F) -> Result<T>
    where
        T: FromRedisValue + Send,
        F: ToRedisArgs + Send,
    {
        self.query(cmd("HGET").arg(key).arg(field)).await
    }

    async fn hgetall<T>(&self, key: &str) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("HGETALL").arg(key)).await
    }

    async fn hdel<F>(&self, key: &str, field: F) -> Result<i64>
    where
        F: ToRedisArgs + Send,
    {
        self.query(cmd("HDEL").arg(key).arg(field)).await
    }

    async fn hexists<F>(&self, key: &str, field: F) -> Result<bool>
    where
        F: ToRedisArgs + Send,
    {
        self.query(cmd("HEXISTS").arg(key).arg(field)).await
    }

    async fn hincr_by<T, F, D>(&self, key: &str, field: F, delta: D) -> Result<T>
    where
        T: FromRedisValue + Send,
        F: ToRedisArgs + Send,
        D: ToRedisArgs + Send,
    {
        self.query(cmd("HINCRBY").arg(key).arg(field).arg(delta)).await
    }

    async fn hmget<T, F>(&self, key: &str, fields: &[F]) -> Result<T>
    where
        T: FromRedisValue + Send,
        F: ToRedisArgs + Sync,
    {
        self.query(cmd("HMGET").arg(key).arg(fields)).await
    }

    async fn sadd<M>(&self, key: &str, member: M) -> Result<()>
    where
        M: ToRedisArgs + Send,
    {
        let _: i64 = self.query(cmd("SADD").arg(key).arg(member)).await?;
        Ok(())
    }

    async fn srem<M>(&self, key: &str, member: M) -> Result<i64>
    where
        M: ToRedisArgs + Send,
    {
        self.query(cmd("SREM").arg(key).arg(member)).await
    }

    async fn scard(&self, key: &str) -> Result<i64> {
        self.query(cmd("SCARD").arg(key)).await
    }

    async fn sismember<M>(&self, key: &str, member: M) -> Result<bool>
    where
        M: ToRedisArgs + Send,
    {
        self.query(cmd("SISMEMBER").arg(key).arg(member)).await
    }

    async fn smembers<T>(&self, key: &str) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("SMEMBERS").arg(key)).await
    }

    async fn zadd<S, M>(&self, key: &str, score: S, member: M) -> Result<()>
    where
        S: ToRedisArgs + Send,
        M: ToRedisArgs + Send,
    {
        let _: i64 = self.zadd_count(key, score, member).await?;
        Ok(())
    }

    /// `ZADD`, returning the number of new members (0 when only the score changed).
    async fn zadd_count<S, M>(&self, key: &str, score: S, member: M) -> Result<i64>
    where
        S: ToRedisArgs + Send,
        M: ToRedisArgs + Send,
    {
        self.query(cmd("ZADD").arg(key).arg(score).arg(member)).await
    }

    async fn zrem<M>(&self, key: &str, member: M) -> Result<i64>
    where
        M: ToRedisArgs + Send,
    {
        self.query(cmd("ZREM").arg(key).arg(member)).await
    }

    async fn zcard(&self, key: &str) -> Result<i64> {
        self.query(cmd("ZCARD").arg(key)).await
    }

    async fn zscore<T, M>(&self, key: &str, member: M) -> Result<T>
    where
        T: FromRedisValue + Send,
        M: ToRedisArgs + Send,
    {
        self.query(cmd("ZSCORE").arg(key).arg(member)).await
    }

    async fn zrange<T>(&self, key: &str, start: isize, stop: isize, scores: bool) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let mut zrange = cmd("ZRANGE");
        zrange.arg(key).arg(start).arg(stop);
        with_scores(&mut zrange, scores);
        self.query(&zrange).await
    }

    /// Highest score first.
    async fn zrevrange<T>(&self, key: &str, start: isize, stop: isize, scores: bool) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let mut zrevrange = cmd("ZREVRANGE");
        zrevrange.arg(key).arg(start).arg(stop);
        with_scores(&mut zrevrange, scores);
        self.query(&zrevrange).await
    }

    /// Bounds accept anything Redis does, e.g. `"-inf"` or `"(5"`.
    async fn zrangebyscore<T, Min, Max>(&self, key: &str, min: Min, max: Max, scores: bool) -> Result<T>
    where
        T: FromRedisValue + Send,
        Min: ToRedisArgs + Send,
        Max: ToRedisArgs + Send,
    {
        let mut zrangebyscore = cmd("ZRANGEBYSCORE");
        zrangebyscore.arg(key).arg(min).arg(max);
        with_scores(&mut zrangebyscore, scores);
        self.query(&zrangebyscore).await
    }

    /// Rank with the highest score ranked 0, or nil when absent.
    async fn zrevrank<T, M>(&self, key: &str, member: M) -> Result<T>
    where
        T: FromRedisValue + Send,
        M: ToRedisArgs + Send,
    {
        self.query(cmd("ZREVRANK").arg(key).arg(member)).await
    }

    async fn zincr_by<T, D, M>(&self, key: &str, delta: D, member: M) -> Result<T>
    where
        T: FromRedisValue + Send,
        D: ToRedisArgs + Send,
        M: ToRedisArgs + Send,
    {
        self.query(cmd("ZINCRBY").arg(key).arg(delta).arg(member)).await
    }

    /// `ZINCRBY` followed by `EXPIRE`.
    ///
    /// The increment has already landed when `EXPIRE` runs, so an `EXPIRE`
    /// failure is logged and the new score is still returned.
    async fn zincr_by_expire<T, D, M>(&self, key: &str, delta: D, member: M, seconds: i64) -> Result<T>
    where
        T: FromRedisValue + Send,
        D: ToRedisArgs + Send,
        M: ToRedisArgs + Send,
    {
        let score = self.zincr_by(key, delta, member).await?;
        if let Err(e) = self.expire(key, seconds).await {
            warn!(key, seconds, error = %e, "failed to set expiry after ZINCRBY");
        }
        Ok(score)
    }

    /// Returns the list length after the push.
    async fn lpush<V>(&self, key: &str, value: V) -> Result<i64>
    where
        V: ToRedisArgs + Send,
    {
        self.query(cmd("LPUSH").arg(key).arg(value)).await
    }

    async fn rpop<T>(&self, key: &str) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("RPOP").arg(key)).await
    }

    /// Blocking `BRPOP`. Decodes to `Option<(key, value)>`-shaped types.
    ///
    /// `timeout_secs` of zero blocks indefinitely on the server, but the call
    /// is still bounded by the pool's response timeout, so keep it below that.
    async fn brpop<T>(&self, key: &str, timeout_secs: u64) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        self.query(cmd("BRPOP").arg(key).arg(timeout_secs)).await
    }

    async fn llen(&self, key: &str) -> Result<i64> {
        self.query(cmd("LLEN").arg(key)).await
    }

    /// Returns the previous bit value.
    async fn setbit(&self, key: &str, offset: u64, bit: bool) -> Result<bool> {
        self.query(cmd("SETBIT").arg(key).arg(offset).arg(u8::from(bit))).await
    }

    async fn getbit(&self, key: &str, offset: u64) -> Result<bool> {
        self.query(cmd("GETBIT").arg(key).arg(offset)).await
    }

    async fn bitcount(&self, key: &str) -> Result<i64> {
        self.query(cmd("BITCOUNT").arg(key)).await
    }
}

impl<E> RedisCommands for E where E: Executor + ?Sized {}
