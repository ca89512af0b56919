//! Configuration management for Lambda functions.

use std::env;
use std::str::FromStr;

use crate::{Error, Result};

/// Which Event Store implementation backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Postgres via sqlx
    Postgres,
    /// Process-local store, contents lost on cold start
    Memory,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(Error::Config(format!("Unknown EVENT_STORE '{}'", other))),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Event Store backend
    pub store_backend: StoreBackend,
    /// Full connection string; skips the secret lookup when set
    pub database_url: Option<String>,
    /// Database host
    pub db_host: Option<String>,
    /// Database port
    pub db_port: u16,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: Option<String>,
    /// Pool size
    pub db_max_connections: u32,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match lookup("EVENT_STORE") {
            Some(value) => value.parse()?,
            None => StoreBackend::Postgres,
        };

        Ok(Self {
            store_backend,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            db_host: lookup("DB_HOST"),
            db_port: parse_or("DB_PORT", lookup("DB_PORT"), 5432)?,
            db_name: lookup("DB_NAME").unwrap_or_else(|| "web_calendar".to_string()),
            db_secret_arn: lookup("DB_SECRET_ARN"),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 5)?,
            aws_region: lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}
