//! Click service configuration.
//!
//! Configuration is loaded from environment variables. The Redis URL may
//! carry credentials and is redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default counter goal (100 million clicks).
pub const DEFAULT_GOAL: u64 = 100_000_000;

/// Default interval between authoritative state reloads.
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 1000;

/// Default SSE keep-alive interval.
pub const DEFAULT_SSE_KEEPALIVE_SECONDS: u64 = 15;

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default shutdown drain period.
pub const DEFAULT_DRAIN_SECONDS: u64 = 5;

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "click";

/// Which storage backend holds the authoritative state.
#[derive(Clone)]
pub enum BackendConfig {
    /// In-process state. Lost on restart; single instance only.
    Memory,
    /// Shared Redis instance.
    Redis {
        /// Protected by `SecretString` to prevent accidental logging.
        url: SecretString,
    },
}

impl BackendConfig {
    /// Backend label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Memory => "memory",
            BackendConfig::Redis { .. } => "redis",
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::Memory => f.write_str("Memory"),
            BackendConfig::Redis { .. } => f
                .debug_struct("Redis")
                .field("url", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Click service configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Fixed upper bound of the counter.
    pub goal: u64,

    /// Authoritative state backend.
    pub backend: BackendConfig,

    /// Whether a winner claim requires the counter to be at its goal.
    pub claim_requires_goal: bool,

    /// Interval between authoritative state reloads by the sync task.
    pub sync_interval: Duration,

    /// SSE keep-alive interval.
    pub sse_keepalive: Duration,

    /// HTTP request timeout (does not apply to SSE streams once started).
    pub request_timeout: Duration,

    /// Drain period between a shutdown signal and server stop.
    pub drain_period: Duration,

    /// Unique identifier for this service instance.
    pub instance_id: String,

    /// Log output format.
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("CLICK_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        if bind_address.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "CLICK_BIND_ADDRESS must be a socket address, got '{bind_address}'"
            )));
        }

        let goal = parse_positive(vars, "CLICK_GOAL", DEFAULT_GOAL)?;

        let backend = match vars.get("CLICK_BACKEND").map(String::as_str) {
            None | Some("memory") => BackendConfig::Memory,
            Some("redis") => {
                let url = vars
                    .get("REDIS_URL")
                    .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?;
                BackendConfig::Redis {
                    url: SecretString::from(url.clone()),
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "CLICK_BACKEND must be 'memory' or 'redis', got '{other}'"
                )));
            }
        };

        let claim_requires_goal = match vars.get("CLICK_CLAIM_REQUIRES_GOAL") {
            None => true,
            Some(value) => value.parse::<bool>().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "CLICK_CLAIM_REQUIRES_GOAL must be 'true' or 'false', got '{value}': {e}"
                ))
            })?,
        };

        let sync_interval = Duration::from_millis(parse_positive(
            vars,
            "CLICK_SYNC_INTERVAL_MS",
            DEFAULT_SYNC_INTERVAL_MS,
        )?);

        let sse_keepalive = Duration::from_secs(parse_positive(
            vars,
            "CLICK_SSE_KEEPALIVE_SECONDS",
            DEFAULT_SSE_KEEPALIVE_SECONDS,
        )?);

        let request_timeout = Duration::from_secs(parse_positive(
            vars,
            "CLICK_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);

        // Zero is allowed: skip draining entirely
        let drain_period = match vars.get("CLICK_DRAIN_SECONDS") {
            None => Duration::from_secs(DEFAULT_DRAIN_SECONDS),
            Some(value) => Duration::from_secs(value.parse().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "CLICK_DRAIN_SECONDS must be a valid integer, got '{value}': {e}"
                ))
            })?),
        };

        let log_format = match vars.get("CLICK_LOG_FORMAT").map(String::as_str) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "CLICK_LOG_FORMAT must be 'text' or 'json', got '{other}'"
                )));
            }
        };

        let instance_id = vars.get("CLICK_INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_INSTANCE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            goal,
            backend,
            claim_requires_goal,
            sync_interval,
            sse_keepalive,
            request_timeout,
            drain_period,
            instance_id,
            log_format,
        })
    }
}

/// Parse an optional integer variable that must be greater than zero.
fn parse_positive(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{key} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{key} must be greater than 0"
        )));
    }

    Ok(value)
}
