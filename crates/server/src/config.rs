//! Server settings read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, anyhow};

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_FETCH_TIMEOUT: u64 = 20;
const DEFAULT_POOL_SIZE: usize = 8;

/// Slack on top of the fetch timeout before a request is abandoned.
const REQUEST_TIMEOUT_MARGIN: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind: SocketAddr,
    /// Seconds the fetcher waits for a page.
    pub fetch_timeout: u64,
    pub pool_size: usize,
}

impl ServerConfig {
    /// Reads `DATABASE_URL`, `QUIRE_BIND`, `QUIRE_FETCH_TIMEOUT` and `QUIRE_POOL_SIZE`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let bind: SocketAddr = lookup("QUIRE_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .context("QUIRE_BIND must be a socket address such as 127.0.0.1:8080")?;

        let fetch_timeout: u64 = match lookup("QUIRE_FETCH_TIMEOUT") {
            Some(value) => value.parse::<u64>().context("QUIRE_FETCH_TIMEOUT must be a whole number of seconds")?,
            None => DEFAULT_FETCH_TIMEOUT,
        };

        let pool_size: usize = match lookup("QUIRE_POOL_SIZE") {
            Some(value) => value.parse::<usize>().context("QUIRE_POOL_SIZE must be a positive integer")?,
            None => DEFAULT_POOL_SIZE,
        };
        if pool_size == 0 {
            return Err(anyhow!("QUIRE_POOL_SIZE must be at least 1"));
        }

        Ok(Self { database_url, bind, fetch_timeout, pool_size })
    }

    /// Upper bound on a whole request, ingestion included.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout + REQUEST_TIMEOUT_MARGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/quire")])).unwrap();

        assert_eq!(config.database_url, "postgres://localhost/quire");
        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.fetch_timeout, 20);
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/quire"),
            ("QUIRE_BIND", "127.0.0.1:9000"),
            ("QUIRE_FETCH_TIMEOUT", "5"),
            ("QUIRE_POOL_SIZE", "2"),
        ]))
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.fetch_timeout, 5);
        assert_eq!(config.pool_size, 2);
    }

    #[test]
    fn test_missing_database_url() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_values() {
        let bad_bind = lookup(&[("DATABASE_URL", "postgres://db"), ("QUIRE_BIND", "nowhere")]);
        assert!(ServerConfig::from_lookup(bad_bind).is_err());

        let bad_timeout = lookup(&[("DATABASE_URL", "postgres://db"), ("QUIRE_FETCH_TIMEOUT", "soon")]);
        assert!(ServerConfig::from_lookup(bad_timeout).is_err());

        let zero_pool = lookup(&[("DATABASE_URL", "postgres://db"), ("QUIRE_POOL_SIZE", "0")]);
        assert!(ServerConfig::from_lookup(zero_pool).is_err());
    }
}
