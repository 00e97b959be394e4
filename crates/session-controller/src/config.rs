//! Session controller configuration.
//!
//! Configuration is loaded from environment variables. The scheduling
//! service token is redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default upper bound for the whole join sequence (resolve + channel join + publish).
pub const DEFAULT_JOIN_TIMEOUT_SECONDS: u64 = 20;

/// Default per-request timeout for scheduling service calls.
pub const DEFAULT_SCHEDULING_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default connect timeout for scheduling service calls.
pub const DEFAULT_SCHEDULING_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Default controller mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Session controller configuration.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the scheduling service (e.g. "https://lms.example.com").
    pub scheduling_api_url: String,

    /// Service token presented to the scheduling service.
    pub scheduling_service_token: SecretString,

    /// Bound on the join sequence before it is treated as failed.
    pub join_timeout_seconds: u64,

    /// Per-request timeout for scheduling calls.
    pub scheduling_request_timeout_seconds: u64,

    /// Connect timeout for scheduling calls.
    pub scheduling_connect_timeout_seconds: u64,

    /// Controller mailbox capacity.
    pub mailbox_capacity: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("scheduling_api_url", &self.scheduling_api_url)
            .field("scheduling_service_token", &"[REDACTED]")
            .field("join_timeout_seconds", &self.join_timeout_seconds)
            .field(
                "scheduling_request_timeout_seconds",
                &self.scheduling_request_timeout_seconds,
            )
            .field(
                "scheduling_connect_timeout_seconds",
                &self.scheduling_connect_timeout_seconds,
            )
            .field("mailbox_capacity", &self.mailbox_capacity)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Settings the controller actor needs, split out so tests can build one
/// without a scheduling endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub join_timeout: Duration,
    pub mailbox_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(DEFAULT_JOIN_TIMEOUT_SECONDS),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let scheduling_api_url = vars
            .get("SCHEDULING_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("SCHEDULING_API_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let scheduling_service_token = SecretString::from(
            vars.get("SCHEDULING_SERVICE_TOKEN")
                .ok_or_else(|| ConfigError::MissingEnvVar("SCHEDULING_SERVICE_TOKEN".to_string()))?
                .clone(),
        );

        let join_timeout_seconds = parse_or_default(
            vars,
            "SESSION_JOIN_TIMEOUT_SECONDS",
            DEFAULT_JOIN_TIMEOUT_SECONDS,
        )?;
        if join_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_JOIN_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        let scheduling_request_timeout_seconds = parse_or_default(
            vars,
            "SCHEDULING_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_SCHEDULING_REQUEST_TIMEOUT_SECONDS,
        )?;

        let scheduling_connect_timeout_seconds = parse_or_default(
            vars,
            "SCHEDULING_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_SCHEDULING_CONNECT_TIMEOUT_SECONDS,
        )?;

        let mailbox_capacity =
            parse_or_default(vars, "SESSION_MAILBOX_CAPACITY", DEFAULT_MAILBOX_CAPACITY)?;
        if mailbox_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_MAILBOX_CAPACITY must be greater than 0".to_string(),
            ));
        }

        Ok(Config {
            scheduling_api_url,
            scheduling_service_token,
            join_timeout_seconds,
            scheduling_request_timeout_seconds,
            scheduling_connect_timeout_seconds,
            mailbox_capacity,
        })
    }

    /// Controller settings derived from this configuration.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            join_timeout: Duration::from_secs(self.join_timeout_seconds),
            mailbox_capacity: self.mailbox_capacity,
        }
    }
}

fn parse_or_default<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key}={raw}"))),
        None => Ok(default),
    }
}
