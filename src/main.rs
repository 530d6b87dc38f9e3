// Entry point: reads the config, binds the listener and serves until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use redis_lite::{Config, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let server = Server::bind(&config).await?;
    server.run().await
}

// Try it with redis-cli:
//
// RUST_LOG=debug cargo run
// redis-cli
// 127.0.0.1:6379> set hello world
// OK
// 127.0.0.1:6379> get hello
// "world"
// 127.0.0.1:6379> hset map hello world
// OK
// 127.0.0.1:6379> hgetall map
// 1) "hello"
// 2) "world"
