//! # Environment Configuration
//!
//! Reads the depot settings from `DEPO_*` environment variables.
//!
//! ```text
//! ┌──────────────────────────────┬───────────────────────┬──────────────────┐
//! │  Variable                    │  Default              │  Used for        │
//! ├──────────────────────────────┼───────────────────────┼──────────────────┤
//! │  DEPO_DB_PATH                │  ./lastik_depo.db     │  DbConfig path   │
//! │  DEPO_MAX_CONNECTIONS        │  5                    │  pool size       │
//! │  DEPO_UTC_OFFSET_MINUTES     │  server time zone     │  SearchContext   │
//! └──────────────────────────────┴───────────────────────┴──────────────────┘
//! ```
//!
//! Binaries call `dotenvy::dotenv()` first so a `.env` file can provide them.

use chrono::FixedOffset;
use std::path::PathBuf;
use thiserror::Error;

use crate::pool::DbConfig;
use depo_core::SearchContext;

pub const ENV_DB_PATH: &str = "DEPO_DB_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "DEPO_MAX_CONNECTIONS";
pub const ENV_UTC_OFFSET_MINUTES: &str = "DEPO_UTC_OFFSET_MINUTES";

pub const DEFAULT_DB_PATH: &str = "./lastik_depo.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

/// Settings of a depot process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotSettings {
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// Overrides the process' local offset for date searches.
    pub utc_offset: Option<FixedOffset>,
}

impl Default for DepotSettings {
    fn default() -> Self {
        DepotSettings {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            utc_offset: None,
        }
    }
}

impl DepotSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = DepotSettings::default();

        if let Some(path) = get(ENV_DB_PATH) {
            settings.database_path = PathBuf::from(path);
        }

        if let Some(raw) = get(ENV_MAX_CONNECTIONS) {
            settings.max_connections = raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()))?;
        }

        if let Some(raw) = get(ENV_UTC_OFFSET_MINUTES) {
            let minutes = raw
                .parse::<i32>()
                .map_err(|_| ConfigError::InvalidValue(ENV_UTC_OFFSET_MINUTES.to_string()))?;
            let offset = minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .ok_or_else(|| ConfigError::InvalidValue(ENV_UTC_OFFSET_MINUTES.to_string()))?;
            settings.utc_offset = Some(offset);
        }

        Ok(settings)
    }

    /// Pool configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }

    /// Search context for one request.
    pub fn search_context(&self) -> SearchContext {
        match self.utc_offset {
            Some(offset) => SearchContext::with_offset(offset),
            None => SearchContext::local(),
        }
    }
}
