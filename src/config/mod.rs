//! Configuration management for tourfetch
//!
//! Settings are layered:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use tourfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `TOURFETCH__<section>__<key>`:
//! - `TOURFETCH__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `TOURFETCH__JOBS__TOUR_WORKERS=8`
//! - `TOURFETCH__FETCH__REQUEST_TIMEOUT=45s`
//! - `TOURFETCH__SOURCE__COLLECTIONS=https://x/collection/1,https://x/collection/2`
//!
//! # Configuration File
//!
//! Read from `config/tourfetch.toml` unless `TOURFETCH_CONFIG` names
//! another path.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{
    ApiLimits, Config, DiscoveryConfig, FetchConfig, JobsConfig, ServerConfig, SourceConfig,
    StorageConfig, StorageProvider, TelemetryConfig,
};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load from the default file location and the environment, then
    /// validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load from a specific file (plus the environment).
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
