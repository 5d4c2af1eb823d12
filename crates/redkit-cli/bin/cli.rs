use clap::{Parser, Subcommand, ValueEnum};
use redkit::TlsMode;
use std::fmt::{Display, Formatter};

pub const ADDR_ENV: &str = "REDKIT_ADDR";
pub const PASSWORD_ENV: &str = "REDKIT_PASSWORD";
pub const DB_ENV: &str = "REDKIT_DB";
pub const TLS_ENV: &str = "REDKIT_TLS";

pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";
pub const DEFAULT_MAX_ACTIVE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TlsArg {
    #[value(name = "disabled")]
    Disabled,
    #[value(name = "enabled")]
    Enabled,
    /// TLS without certificate verification.
    #[value(name = "insecure")]
    Insecure,
}

impl Display for TlsArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsArg::Disabled => write!(f, "disabled"),
            TlsArg::Enabled => write!(f, "enabled"),
            TlsArg::Insecure => write!(f, "insecure"),
        }
    }
}

impl From<TlsArg> for TlsMode {
    fn from(arg: TlsArg) -> Self {
        match arg {
            TlsArg::Disabled => TlsMode::Disabled,
            TlsArg::Enabled => TlsMode::Enabled,
            TlsArg::Insecure => TlsMode::Insecure,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "redkit", about = "Run redkit helpers against a Redis server")]
pub struct CLI {
    #[arg(long, env = ADDR_ENV, default_value = DEFAULT_ADDR)]
    pub addr: String,

    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = DB_ENV, default_value_t = 0)]
    pub db: i64,

    #[arg(long, env = TLS_ENV, value_enum, default_value_t = TlsArg::Disabled)]
    pub tls: TlsArg,

    #[arg(long, default_value_t = DEFAULT_MAX_ACTIVE)]
    pub max_active: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the server answers.
    Ping,
    /// Print the value stored at a key.
    Get { key: String },
    /// Store a value, optionally expiring after `--ttl` seconds.
    Set {
        key: String,
        value: String,
        #[arg(long)]
        ttl: Option<u64>,
    },
    Del { key: String },
    /// List keys matching a glob pattern with `KEYS`.
    Keys { pattern: String },
    /// Delete keys matching a glob pattern, walking `SCAN`.
    DelPattern { pattern: String },
}
