//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::rpc::{RpcSettings, SendOptions};

/// Backend carrying the pub/sub bus, cache and work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusBackend {
    /// Shared Redis server; required for more than one gateway instance.
    Redis,
    /// In-process bus and queue, for local runs without Redis.
    Memory,
}

impl FromStr for BusBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown bus backend: {other}")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Redis connection URL.
    pub redis_url: String,

    /// Bus, cache and queue backend.
    pub bus_backend: BusBackend,

    /// Number of RPC worker shards (`SUBSCRIBERS_INSTANCES`).
    pub worker_shards: u32,

    /// Deadline of each RPC attempt, in milliseconds.
    pub rpc_timeout_ms: u64,

    /// Retries after the first RPC attempt.
    pub rpc_max_retries: u32,

    /// Delay before the first RPC retry, in milliseconds.
    pub rpc_retry_delay_ms: u64,

    /// Time-to-live of a cached round, in seconds.
    pub round_cache_ttl_secs: u64,

    /// Name of the queue bets are enqueued on.
    pub bet_queue_name: String,

    /// Key prefix of the queue's Redis lists.
    pub queue_key_prefix: String,

    /// Capacity of the transport's message feed.
    pub event_bus_capacity: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`], or if `BUS_BACKEND` names an unknown backend.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let mut listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;
        if std::env::var("LISTEN_ADDR").is_err()
            && let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok())
        {
            listen_addr.set_port(port);
        }

        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| {
            redis_url_from_parts(
                &std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                parse_env("REDIS_PORT", 6379),
                std::env::var("REDIS_PASSWORD").ok().as_deref(),
            )
        });

        let bus_backend = std::env::var("BUS_BACKEND")
            .unwrap_or_else(|_| "redis".to_string())
            .parse::<BusBackend>()?;

        let log_format = if std::env::var("LOG_FORMAT")
            .is_ok_and(|v| v.eq_ignore_ascii_case("json"))
        {
            LogFormat::Json
        } else {
            LogFormat::Text
        };

        Ok(Self {
            listen_addr,
            redis_url,
            bus_backend,
            worker_shards: parse_env("SUBSCRIBERS_INSTANCES", 1_u32).max(1),
            rpc_timeout_ms: parse_env("RPC_TIMEOUT_MS", 2000),
            rpc_max_retries: parse_env("RPC_MAX_RETRIES", 3),
            rpc_retry_delay_ms: parse_env("RPC_RETRY_DELAY_MS", 500),
            round_cache_ttl_secs: parse_env("ROUND_CACHE_TTL_SECS", 35),
            bet_queue_name: std::env::var("BET_QUEUE_NAME").unwrap_or_else(|_| "bet".to_string()),
            queue_key_prefix: std::env::var("QUEUE_KEY_PREFIX")
                .unwrap_or_else(|_| "bull".to_string()),
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", 10_000),
            log_format,
        })
    }

    /// RPC client settings derived from this configuration.
    #[must_use]
    pub fn rpc_settings(&self) -> RpcSettings {
        RpcSettings {
            shard_count: self.worker_shards,
            defaults: SendOptions {
                timeout: Duration::from_millis(self.rpc_timeout_ms),
                max_retries: self.rpc_max_retries,
                initial_backoff: Duration::from_millis(self.rpc_retry_delay_ms),
            },
        }
    }
}

/// Builds `redis://[:password@]host:port`.
fn redis_url_from_parts(host: &str, port: u16, password: Option<&str>) -> String {
    match password.filter(|p| !p.is_empty()) {
        Some(password) => format!("redis://:{password}@{host}:{port}"),
        None => format!("redis://{host}:{port}"),
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_with_and_without_password() {
        assert_eq!(
            redis_url_from_parts("cache", 6380, Some("s3cret")),
            "redis://:s3cret@cache:6380"
        );
        assert_eq!(redis_url_from_parts("cache", 6379, None), "redis://cache:6379");
        assert_eq!(redis_url_from_parts("cache", 6379, Some("")), "redis://cache:6379");
    }

    #[test]
    fn bus_backend_parsing() {
        assert_eq!("Memory".parse::<BusBackend>(), Ok(BusBackend::Memory));
        assert_eq!("redis".parse::<BusBackend>(), Ok(BusBackend::Redis));
        assert!("kafka".parse::<BusBackend>().is_err());
    }

    #[test]
    fn missing_variable_falls_back_to_default() {
        assert_eq!(parse_env("ROULETTE_GATEWAY_UNSET_FOR_TEST", 42_u32), 42);
    }
}
