//! Authorizer configuration.
//!
//! Configuration is loaded from environment variables. The trusted issuer,
//! trusted client and key-set URL have no defaults: an authorizer that silently
//! trusted a built-in issuer would be worse than one that refuses to start.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default principal identifier placed in every decision.
pub const DEFAULT_PRINCIPAL_ID: &str = "user";

/// Default key-set cache TTL in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default window in seconds during which an expired key set may still be
/// served when the issuer cannot be reached.
pub const DEFAULT_JWKS_MAX_STALE_SECONDS: u64 = 3600;

/// Default minimum spacing in seconds between refreshes forced by an unknown `kid`.
pub const DEFAULT_JWKS_MISS_REFRESH_COOLDOWN_SECONDS: u64 = 30;

/// Default timeout in seconds for one key-set fetch.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the key-set fetch timeout.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Default per-request deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Authorizer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Issuer's published key-set (JWKS) URL.
    pub jwks_url: String,

    /// Exact `iss` value accepted.
    pub trusted_issuer: String,

    /// Exact `client_id` value accepted.
    pub trusted_client_id: String,

    /// Principal identifier reported in decisions (default: "user").
    pub principal_id: String,

    /// How long a fetched key set is used without refetching. Zero fetches on every call.
    pub jwks_cache_ttl: Duration,

    /// How long past its TTL a key set may be served if refresh fails. Zero disables.
    pub jwks_max_stale: Duration,

    /// Minimum spacing between refreshes triggered by an unknown key ID.
    pub jwks_miss_refresh_cooldown: Duration,

    /// Timeout for a single key-set fetch.
    pub jwks_fetch_timeout: Duration,

    /// Deadline for a whole authorization request.
    pub request_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_url = required(vars, "JWKS_URL")?;
        let trusted_issuer = required(vars, "TRUSTED_ISSUER")?;
        let trusted_client_id = required(vars, "TRUSTED_CLIENT_ID")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let principal_id = vars
            .get("PRINCIPAL_ID")
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_PRINCIPAL_ID.to_string());

        let jwks_cache_ttl = seconds(vars, "JWKS_CACHE_TTL_SECONDS", DEFAULT_JWKS_CACHE_TTL_SECONDS)?;
        let jwks_max_stale = seconds(vars, "JWKS_MAX_STALE_SECONDS", DEFAULT_JWKS_MAX_STALE_SECONDS)?;
        let jwks_miss_refresh_cooldown = seconds(
            vars,
            "JWKS_MISS_REFRESH_COOLDOWN_SECONDS",
            DEFAULT_JWKS_MISS_REFRESH_COOLDOWN_SECONDS,
        )?;

        let jwks_fetch_timeout = seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?;
        if jwks_fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "JWKS_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }
        if jwks_fetch_timeout.as_secs() > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidDuration(format!(
                "JWKS_FETCH_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                MAX_JWKS_FETCH_TIMEOUT_SECONDS,
                jwks_fetch_timeout.as_secs()
            )));
        }

        let request_timeout = seconds(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?;
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        Ok(Config {
            bind_address,
            jwks_url,
            trusted_issuer,
            trusted_client_id,
            principal_id,
            jwks_cache_ttl,
            jwks_max_stale,
            jwks_miss_refresh_cooldown,
            jwks_fetch_timeout,
            request_timeout,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{} must be a non-negative integer number of seconds, got '{}': {}",
            name, value_str, e
        ))
    })?;

    Ok(Duration::from_secs(value))
}
