//! Configuration management using environment variables
//!
//! Every externally visible knob of the gateway is environment-driven:
//! bind address, downstream base URLs, broker connection, queue names and
//! the retry policy. Invalid values fail at startup with a config error
//! rather than at first use.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::message::{PAYMENT_RETRY_DLQ, PAYMENT_RETRY_QUEUE};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Downstream backend configuration
    pub downstream: DownstreamConfig,

    /// Message broker configuration
    pub broker: BrokerConfig,

    /// Retry engine configuration
    pub retry: RetryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,
}

/// Downstream backend configuration
#[derive(Debug, Clone)]
pub struct DownstreamConfig {
    /// Base URL of the authentication backend
    pub auth_base_url: String,

    /// Base URL of the payment backend
    pub payments_base_url: String,

    /// Per-request timeout for gateway-to-backend calls, in seconds
    pub timeout_secs: u64,
}

impl DownstreamConfig {
    /// Per-request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Message broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker host
    pub host: String,

    /// Broker port
    pub port: u16,

    /// Broker password (optional)
    pub password: Option<String>,

    /// Direct broker URL (takes precedence over host/port/password)
    pub url: Option<String>,

    /// Name of the retry queue
    pub queue_name: String,

    /// Name of the dead letter queue
    pub dlq_name: String,
}

impl BrokerConfig {
    /// Build a broker connection URL
    ///
    /// If `url` is set (from REDIS_URL), uses that directly. Otherwise
    /// builds the URL from host/port/password components.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        if let Some(password) = &self.password {
            format!("redis://:{}@{}:{}", password, self.host, self.port)
        } else {
            format!("redis://{}:{}", self.host, self.port)
        }
    }
}

/// Retry engine configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Downstream calls per worker invocation (must be at least 1)
    pub max_attempts: u32,

    /// Fixed delay before each retry attempt, in seconds
    pub delay_secs: u64,

    /// Maximum number of concurrently running retry workers
    pub worker_concurrency: usize,

    /// Republish cycles before a message is dead-lettered
    pub max_republish_cycles: u32,

    /// Blocking-pop timeout for the consume loop, in seconds
    pub consume_timeout_secs: u64,

    /// Backoff after a broker error in the consume loop, in seconds
    pub consume_backoff_secs: u64,
}

impl RetryConfig {
    /// Fixed inter-attempt delay as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Consume-loop error backoff as a Duration
    pub fn consume_backoff(&self) -> Duration {
        Duration::from_secs(self.consume_backoff_secs)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let retry = RetryConfig {
            max_attempts: env_parse("RETRY_MAX_ATTEMPTS", 5)?,
            delay_secs: env_parse("RETRY_DELAY_SECS", 30)?,
            worker_concurrency: env_parse("RETRY_WORKER_CONCURRENCY", 16)?,
            max_republish_cycles: env_parse("RETRY_MAX_CYCLES", 8)?,
            consume_timeout_secs: env_parse("RETRY_CONSUME_TIMEOUT_SECS", 5)?,
            consume_backoff_secs: env_parse("RETRY_CONSUME_BACKOFF_SECS", 5)?,
        };

        if retry.max_attempts == 0 {
            return Err(Error::config("RETRY_MAX_ATTEMPTS must be at least 1"));
        }
        if retry.worker_concurrency == 0 {
            return Err(Error::config("RETRY_WORKER_CONCURRENCY must be at least 1"));
        }
        if retry.max_republish_cycles == 0 {
            return Err(Error::config("RETRY_MAX_CYCLES must be at least 1"));
        }

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_parse("SERVER_PORT", 8080)?,
            },
            downstream: DownstreamConfig {
                auth_base_url: env_base_url("AUTH_SERVICE_URL", "http://localhost:8081")?,
                payments_base_url: env_base_url("PAYMENTS_SERVICE_URL", "http://localhost:8082")?,
                timeout_secs: env_parse("DOWNSTREAM_TIMEOUT_SECS", 30)?,
            },
            broker: BrokerConfig {
                host: env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: env_parse("REDIS_PORT", 6379)?,
                password: env::var("REDIS_PASSWORD").ok(),
                url: env::var("REDIS_URL").ok(),
                queue_name: env::var("RETRY_QUEUE_NAME")
                    .unwrap_or_else(|_| PAYMENT_RETRY_QUEUE.to_string()),
                dlq_name: env::var("RETRY_DLQ_NAME")
                    .unwrap_or_else(|_| PAYMENT_RETRY_DLQ.to_string()),
            },
            retry,
        })
    }
}

/// Read an environment variable and parse it, falling back to a default
/// when the variable is unset.
fn env_parse<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("Invalid {}: {}", var, e))),
        Err(_) => Ok(default),
    }
}

/// Read a base URL variable, validate it parses as an absolute URL and
/// strip any trailing slash so paths can be appended uniformly.
fn env_base_url(var: &str, default: &str) -> Result<String> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    url::Url::parse(&raw).map_err(|e| Error::config(format!("Invalid {}: {}", var, e)))?;
    Ok(raw.trim_end_matches('/').to_string())
}
