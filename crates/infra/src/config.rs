//! Process configuration, read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PARTSTOCK_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `DATABASE_URL` | unset | Postgres URL; the in-memory store is used when unset |
//! | `PARTSTOCK_TX_TIMEOUT_MS` | `5000` | Bound on one build transaction |
//! | `PARTSTOCK_DB_MAX_CONNECTIONS` | `10` | Postgres pool size |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "PARTSTOCK_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const TX_TIMEOUT_VAR: &str = "PARTSTOCK_TX_TIMEOUT_MS";
pub const DB_MAX_CONNECTIONS_VAR: &str = "PARTSTOCK_DB_MAX_CONNECTIONS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TX_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub tx_timeout: Duration,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable source. Empty values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr: SocketAddr = parse_or(BIND_ADDR_VAR, get(BIND_ADDR_VAR), || {
            DEFAULT_BIND_ADDR.parse().map_err(|e| format!("{e}"))
        })?;

        let tx_timeout_ms: u64 = parse_or(TX_TIMEOUT_VAR, get(TX_TIMEOUT_VAR), || Ok(DEFAULT_TX_TIMEOUT_MS))?;
        if tx_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: TX_TIMEOUT_VAR,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let db_max_connections: u32 = parse_or(DB_MAX_CONNECTIONS_VAR, get(DB_MAX_CONNECTIONS_VAR), || {
            Ok(DEFAULT_DB_MAX_CONNECTIONS)
        })?;
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: DB_MAX_CONNECTIONS_VAR,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            database_url: get(DATABASE_URL_VAR),
            tx_timeout: Duration::from_millis(tx_timeout_ms),
            db_max_connections,
        })
    }
}

fn parse_or<T>(
    var: &'static str,
    value: Option<String>,
    default: impl FnOnce() -> Result<T, String>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let result = match &value {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| e.to_string()),
        None => default(),
    };
    result.map_err(|reason| ConfigError::Invalid {
        var,
        value: value.unwrap_or_default(),
        reason,
    })
}
