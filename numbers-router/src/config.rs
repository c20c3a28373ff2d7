use crate::fetcher::DEFAULT_MAX_BODY_BYTES;
use serde::Deserialize;
use shared::http::ServerTimeouts;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Upstream timeout cannot be 0")]
    InvalidTimeout,

    #[error("Listener timeouts cannot be 0")]
    InvalidListenerTimeout,

    #[error("Upstream body limit cannot be 0")]
    InvalidBodyLimit,
}

/// How the upstreams of a single request are contacted
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One task per upstream, all joined before merging
    #[default]
    Parallel,
    /// Upstreams are fetched one after another
    Sequential,
}

/// Numbers router configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Main listener serving `/numbers`
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    pub admin_listener: Listener,
    /// Settings applied to every upstream fetch
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listener: Listener::new("0.0.0.0", 8080),
            admin_listener: Listener::new("127.0.0.1", 8081),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Config {
    /// Validates the router configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.upstream.validate()?;

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
    /// Time a client gets to send a complete request head
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Time the service gets to produce a response
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_read_timeout_ms() -> u64 {
    5_000
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

impl Listener {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }

    pub fn timeouts(&self) -> ServerTimeouts {
        ServerTimeouts {
            header_read: Duration::from_millis(self.read_timeout_ms),
            response: Duration::from_millis(self.write_timeout_ms),
        }
    }

    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.read_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(ValidationError::InvalidListenerTimeout);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bound on a whole upstream fetch: connect, headers and body
    pub timeout_ms: u64,
    pub execution_mode: ExecutionMode,
    /// Upstream bodies larger than this are rejected as undecodable
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            execution_mode: ExecutionMode::Parallel,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_body_bytes == 0 {
            return Err(ValidationError::InvalidBodyLimit);
        }
        Ok(())
    }
}
