use std::str::FromStr;
use std::time::Duration;

use crate::domain::order::{CommandSettings, PageLimits};

// ============================================================================
// Service Configuration
// ============================================================================
//
// Everything comes from the environment; a `.env` file in the working
// directory is loaded first when present. Only DATABASE_URL is required.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub database_max_connections: u32,
    /// Attempts made to reach the database at startup
    pub db_connect_attempts: u32,
    pub http_host: String,
    pub http_port: u16,
    pub default_limit: i64,
    pub max_limit: i64,
    /// Deadline for one order operation
    pub request_timeout: Duration,
    /// Return deleted items' quantities to inventory
    pub restock_on_delete: bool,
    pub health_check_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let default_limit: i64 = parse_or(&lookup, "DEFAULT_LIMIT", 10)?;
        let max_limit: i64 = parse_or(&lookup, "MAX_LIMIT", 100)?;
        if default_limit <= 0 {
            return Err(invalid("DEFAULT_LIMIT", default_limit, "must be positive"));
        }
        if max_limit < default_limit {
            return Err(invalid("MAX_LIMIT", max_limit, "must not be below DEFAULT_LIMIT"));
        }

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10)?;
        if request_timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", request_timeout_secs, "must be positive"));
        }

        let health_check_interval_secs: u64 = parse_or(&lookup, "HEALTH_CHECK_INTERVAL_SECS", 10)?;
        if health_check_interval_secs == 0 {
            return Err(invalid(
                "HEALTH_CHECK_INTERVAL_SECS",
                health_check_interval_secs,
                "must be positive",
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 30)?,
            db_connect_attempts: parse_or(&lookup, "DB_CONNECT_ATTEMPTS", 5)?,
            http_host: lookup("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: parse_or(&lookup, "HTTP_PORT", 8081)?,
            default_limit,
            max_limit,
            request_timeout: Duration::from_secs(request_timeout_secs),
            restock_on_delete: parse_or(&lookup, "ORDER_RESTOCK_ON_DELETE", false)?,
            health_check_interval: Duration::from_secs(health_check_interval_secs),
        })
    }

    pub fn command_settings(&self) -> CommandSettings {
        CommandSettings {
            request_timeout: self.request_timeout,
            restock_on_delete: self.restock_on_delete,
        }
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.http_host.clone(), self.http_port)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn invalid(name: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
