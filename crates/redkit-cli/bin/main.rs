mod cli;

use crate::cli::{Command, CLI};
use clap::Parser;
use redkit::{ConnectTarget, PoolOptions, RedisCommands, RedisPool, TlsMode};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = CLI::try_parse()?;

    let mut target = ConnectTarget::builder()
        .addr(config.addr.clone())
        .db(config.db)
        .tls(TlsMode::from(config.tls))
        .build();
    target.password = config.password;

    info!(addr = %target.addr, db = target.db, tls = %config.tls, "connecting to redis");

    let options = PoolOptions::builder()
        .max_active(config.max_active)
        .max_idle(config.max_active)
        .build();
    let pool = RedisPool::connect(&target, options).await?;

    run(&pool, config.command).await?;
    pool.close();
    Ok(())
}

async fn run(pool: &RedisPool, command: Command) -> redkit::Result<()> {
    match command {
        Command::Ping => {
            // connect() has already round-tripped a PING.
            println!("PONG");
        }
        Command::Get { key } => match pool.get::<Option<String>>(&key).await? {
            Some(value) => println!("{value}"),
            None => println!("(nil)"),
        },
        Command::Set { key, value, ttl } => {
            match ttl {
                Some(seconds) => pool.set_ex(&key, value, seconds).await?,
                None => pool.set(&key, value).await?,
            }
            println!("OK");
        }
        Command::Del { key } => {
            println!("{}", pool.del(&key).await?);
        }
        Command::Keys { pattern } => {
            let mut keys: Vec<Vec<u8>> = pool.keys(&pattern).await?;
            keys.sort();
            for key in keys {
                println!("{}", String::from_utf8_lossy(&key));
            }
        }
        Command::DelPattern { pattern } => {
            let removed = pool.del_pattern(&pattern).await?;
            info!(%pattern, removed, "deleted matching keys");
            println!("{removed}");
        }
    }
    Ok(())
}
