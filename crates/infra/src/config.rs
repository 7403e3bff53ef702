//! Process configuration read from the environment.

use std::env;

use chrono::Duration;
use orgdesk_auth::AuthConfig;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// One leap year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration.
///
/// | Variable | Default |
/// |----------|---------|
/// | `BIND_ADDR` | `0.0.0.0:8080` |
/// | `DATABASE_URL` | unset: in-memory store |
/// | `DATABASE_MAX_CONNECTIONS` | `5` |
/// | `JWT_SECRET` | `dev-secret` (insecure, warned about at startup) |
/// | `TOKEN_TTL_HOURS` | `24` |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse_positive("DATABASE_MAX_CONNECTIONS", raw)?,
            None => defaults.max_connections,
        };

        let token_ttl = match get("TOKEN_TTL_HOURS") {
            Some(raw) => parse_ttl_hours(raw)?,
            None => Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        };

        let mut auth = match get("JWT_SECRET") {
            Some(secret) => AuthConfig::with_secret(secret),
            None => AuthConfig::default(),
        };
        auth.token_ttl = token_ttl;

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: get("DATABASE_URL"),
            max_connections,
            auth,
        })
    }

    pub fn uses_insecure_secret(&self) -> bool {
        self.auth.uses_insecure_secret()
    }
}

fn parse_positive<T>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let parsed = raw.trim().parse::<T>().ok();
    match parsed {
        Some(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a positive integer",
            value: raw,
        }),
    }
}

fn parse_ttl_hours(raw: String) -> Result<Duration, ConfigError> {
    let hours: i64 = parse_positive("TOKEN_TTL_HOURS", raw.clone())?;
    match Duration::try_hours(hours) {
        Some(ttl) if hours <= MAX_TOKEN_TTL_HOURS => Ok(ttl),
        _ => Err(ConfigError::Invalid {
            name: "TOKEN_TTL_HOURS",
            expected: "at most 8784 hours",
            value: raw,
        }),
    }
}
