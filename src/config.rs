//! Server configuration from environment variables
//!
//! ## Variables
//! - `NOTIFY_BIND_ADDR`: HTTP listen address (default `0.0.0.0:8080`)
//! - `NOTIFY_REDIS_URL`: Redis connection URL (default `redis://127.0.0.1:6379`)
//! - `NOTIFY_CHANNEL`: external channel the bridge listens on (default `auction-updates`)
//! - `NOTIFY_HEARTBEAT_SECS`: seconds between heartbeats (default 30)
//! - `NOTIFY_QUEUE_CAPACITY`: per-subscriber queue capacity (default 10)
//!
//! Log filtering is read separately from `NOTIFY_LOG`.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::fanout::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;
use crate::fanout::DEFAULT_QUEUE_CAPACITY;

/// Errors raised while reading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings for the notification server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub redis_url: String,
    pub channel: String,
    pub heartbeat_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            channel: "auction-updates".to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults; set but unparseable keys are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let heartbeat_secs: u64 = parse(&lookup, "NOTIFY_HEARTBEAT_SECS")?
            .unwrap_or(defaults.heartbeat_interval.as_secs());
        if heartbeat_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "NOTIFY_HEARTBEAT_SECS",
                value: heartbeat_secs.to_string(),
            });
        }

        let queue_capacity: usize =
            parse(&lookup, "NOTIFY_QUEUE_CAPACITY")?.unwrap_or(defaults.queue_capacity);
        if queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "NOTIFY_QUEUE_CAPACITY",
                value: queue_capacity.to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse(&lookup, "NOTIFY_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            redis_url: lookup("NOTIFY_REDIS_URL").unwrap_or(defaults.redis_url),
            channel: lookup("NOTIFY_CHANNEL")
                .filter(|channel| !channel.is_empty())
                .unwrap_or(defaults.channel),
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            queue_capacity,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.channel, "auction-updates");
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("NOTIFY_BIND_ADDR", "127.0.0.1:9000"),
            ("NOTIFY_REDIS_URL", "redis://cache:6379/2"),
            ("NOTIFY_CHANNEL", "lot-events"),
            ("NOTIFY_HEARTBEAT_SECS", "5"),
            ("NOTIFY_QUEUE_CAPACITY", "64"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.redis_url, "redis://cache:6379/2");
        assert_eq!(config.channel, "lot-events");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.queue_capacity, 64);
    }

    #[test]
    fn test_rejects_unparseable_values() {
        let err = from_pairs(&[("NOTIFY_HEARTBEAT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("NOTIFY_HEARTBEAT_SECS"));

        assert!(from_pairs(&[("NOTIFY_BIND_ADDR", "localhost")]).is_err());
    }

    #[test]
    fn test_rejects_zero_values() {
        assert!(from_pairs(&[("NOTIFY_HEARTBEAT_SECS", "0")]).is_err());
        assert!(from_pairs(&[("NOTIFY_QUEUE_CAPACITY", "0")]).is_err());
    }
}
