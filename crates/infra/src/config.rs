//! Process configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Secret used when `JWT_SECRET` is unset. Never acceptable outside dev.
pub const DEV_JWT_SECRET: &str = "dev-secret";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_JWT_LEEWAY_SECS: i64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Default HS256 secret, used for tokens without a `kid`.
    pub jwt_secret: String,
    /// `true` when `jwt_secret` is the built-in dev value.
    pub jwt_secret_is_default: bool,
    /// Additional secrets selected by the token header's `kid`.
    pub jwt_keys: Vec<(String, String)>,
    pub jwt_leeway_secs: i64,
    pub policy_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (jwt_secret, jwt_secret_is_default) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let jwt_keys = match get("JWT_KEYS") {
            Some(raw) => parse_key_list(&raw)?,
            None => Vec::new(),
        };

        let jwt_leeway_secs = match get("JWT_LEEWAY_SECS") {
            Some(raw) => {
                let secs: i64 = raw
                    .parse()
                    .map_err(|e| ConfigError::invalid("JWT_LEEWAY_SECS", format!("{e}")))?;
                if secs < 0 {
                    return Err(ConfigError::invalid("JWT_LEEWAY_SECS", "must not be negative"));
                }
                secs
            }
            None => DEFAULT_JWT_LEEWAY_SECS,
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", format!("{e}")))?;

        let request_timeout = match get("REQUEST_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw
                    .parse()
                    .map_err(|e| ConfigError::invalid("REQUEST_TIMEOUT_MS", format!("{e}")))?;
                if ms == 0 {
                    return Err(ConfigError::invalid("REQUEST_TIMEOUT_MS", "must be positive"));
                }
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        };

        Ok(Self {
            jwt_secret,
            jwt_secret_is_default,
            jwt_keys,
            jwt_leeway_secs,
            policy_path: get("POLICY_PATH").map(PathBuf::from),
            database_url: get("DATABASE_URL"),
            bind_addr,
            request_timeout,
        })
    }
}

/// Parse `kid=secret,kid2=secret2`.
fn parse_key_list(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (kid, secret) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::invalid("JWT_KEYS", "expected kid=secret"))?;
            let (kid, secret) = (kid.trim(), secret.trim());
            if kid.is_empty() || secret.is_empty() {
                return Err(ConfigError::invalid("JWT_KEYS", "empty kid or secret"));
            }
            Ok((kid.to_string(), secret.to_string()))
        })
        .collect()
}
