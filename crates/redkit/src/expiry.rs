use deadpool_redis::redis::Cmd;
use jiff::Timestamp;
use std::time::Duration;

/// Expiry used by [`get_or_compute`](crate::ReadThroughCache::get_or_compute).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// How long a value written by the read-through helpers stays in Redis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Keep the value until it is deleted.
    Never,
    /// Expire after a relative duration.
    ///
    /// Whole seconds are sent as `EX`, anything finer as `PX` in
    /// milliseconds (rounded up). A zero duration means [`Expiry::Never`].
    Ttl(Duration),
    /// Expire at an absolute point in time, at whole-second precision.
    ///
    /// Timestamps at or before the unix epoch mean [`Expiry::Never`].
    At(Timestamp),
}

impl Expiry {
    /// Expiry from a TTL in seconds. Zero means no expiry.
    pub fn from_secs(secs: u64) -> Self {
        Self::Ttl(Duration::from_secs(secs))
    }

    /// Expiry from a unix timestamp in seconds. Zero or negative means no expiry.
    pub fn at_unix(secs: i64) -> Self {
        if secs <= 0 {
            return Self::Never;
        }
        match Timestamp::from_second(secs) {
            Ok(ts) => Self::At(ts),
            Err(_) => Self::Never,
        }
    }

    /// Builds `SET key value [EX secs | PX millis | EXAT unix_secs]`.
    pub(crate) fn set_cmd(&self, key: &str, value: &[u8]) -> Cmd {
        let mut cmd = Cmd::new();
        cmd.arg("SET").arg(key).arg(value);
        match self {
            Expiry::Never => {}
            Expiry::Ttl(ttl) if ttl.is_zero() => {}
            Expiry::Ttl(ttl) if ttl.subsec_nanos() == 0 => {
                cmd.arg("EX").arg(ttl.as_secs());
            }
            Expiry::Ttl(ttl) => {
                let millis = ttl.as_nanos().div_ceil(1_000_000);
                cmd.arg("PX").arg(u64::try_from(millis).unwrap_or(u64::MAX));
            }
            Expiry::At(ts) if ts.as_second() <= 0 => {}
            Expiry::At(ts) => {
                cmd.arg("EXAT").arg(ts.as_second());
            }
        }
        cmd
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Self::Ttl(DEFAULT_CACHE_TTL)
    }
}

impl From<Duration> for Expiry {
    fn from(ttl: Duration) -> Self {
        Self::Ttl(ttl)
    }
}

impl From<Timestamp> for Expiry {
    fn from(at: Timestamp) -> Self {
        Self::At(at)
    }
}
