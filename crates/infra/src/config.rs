//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub use catalog_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORAGE_DIR: &str = "storage/products";
const DEFAULT_PUBLIC_URL: &str = "/storage";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where uploaded images are written and how they are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub public_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub storage: StorageConfig,
    pub log_format: LogFormat,
    /// Load the seed catalog at startup.
    pub seed_on_start: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("CATALOG_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.trim().parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                var: "CATALOG_BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let log_format = match get("CATALOG_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|e: catalog_observability::UnknownLogFormat| {
                ConfigError::Invalid {
                    var: "CATALOG_LOG_FORMAT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => LogFormat::default(),
        };

        let seed_on_start = match get("CATALOG_SEED_ON_START") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "CATALOG_SEED_ON_START",
                value: raw.clone(),
                reason: "expected true/false or 1/0".to_string(),
            })?,
            None => false,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            storage: StorageConfig {
                dir: get("CATALOG_STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
                public_url: get("CATALOG_PUBLIC_URL")
                    .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string()),
            },
            log_format,
            seed_on_start,
        })
    }
}

/// Parse `1/0/true/false` (case-insensitive).
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}
