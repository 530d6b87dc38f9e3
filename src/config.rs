use clap::Parser;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Server settings, read from the command line or the environment.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "redis-lite", version, about = "A small in-memory server speaking RESP")]
pub struct Config {
    /// Address to bind to
    #[arg(long, env = "REDIS_LITE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "REDIS_LITE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Commands that may wait for the dispatcher before readers block
    #[arg(
        long,
        env = "REDIS_LITE_QUEUE_CAPACITY",
        default_value_t = DEFAULT_QUEUE_CAPACITY,
        value_parser = parse_capacity
    )]
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// tokio's bounded channel panics on a zero capacity.
fn parse_capacity(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("queue capacity must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = Config::try_parse_from(["redis-lite"])?;
        assert_eq!(config, Config::default());
        assert_eq!(config.addr(), "0.0.0.0:6379");
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let config = Config::try_parse_from([
            "redis-lite",
            "--host",
            "127.0.0.1",
            "-p",
            "7000",
            "--queue-capacity",
            "8",
        ])?;
        assert_eq!(config.addr(), "127.0.0.1:7000");
        assert_eq!(config.queue_capacity, 8);
        Ok(())
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let ret = Config::try_parse_from(["redis-lite", "--queue-capacity", "0"]);
        assert!(ret.is_err());
    }
}
