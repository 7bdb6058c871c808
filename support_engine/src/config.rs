//! Runtime configuration for the HTTP service.
//!
//! Settings come from the environment, with a `.env` file honoured when
//! present.  The library itself needs no configuration; only the binary
//! reads these values.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "SUPPORT_BIND_ADDR";
pub const TABLES_DIR_VAR: &str = "SUPPORT_TABLES_DIR";
pub const SCORING_CONFIG_VAR: &str = "SUPPORT_SCORING_CONFIG";
pub const LOG_LEVEL_VAR: &str = "SUPPORT_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Extra statutory-year JSON files, loaded on top of the embedded years.
    pub tables_dir: Option<PathBuf>,
    /// Scoring weights as JSON; the default weights apply when unset.
    pub scoring_config: Option<PathBuf>,
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SUPPORT_BIND_ADDR must be a socket address such as 127.0.0.1:3000 (got '{value}')")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind = env::var(BIND_ADDR_VAR).unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let bind_addr = bind
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind.clone(),
                source,
            })?;
        let path_var = |name: &str| {
            env::var(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        };

        Ok(Self {
            bind_addr,
            tables_dir: path_var(TABLES_DIR_VAR),
            scoring_config: path_var(SCORING_CONFIG_VAR),
            log_level: env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| "info".to_string()),
        })
    }
}
