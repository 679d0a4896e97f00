//! Workbench configuration
//!
//! Values come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file named by `WORKBENCH_CONFIG` (optional)
//! 3. `WORKBENCH_API_BASE_URL`, `WORKBENCH_STORAGE_PATH` and `RUST_LOG`
//!
//! # Example
//!
//! ```toml
//! api_base_url = "http://localhost:3000"
//! storage_path = "/tmp/workbench.json"
//! log_filter = "debug"
//! request_timeout_secs = 5
//! ```

use serde::{Deserialize, Serialize};
use sliceflow_query::DEFAULT_BASE_URL;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Names the TOML file to load
pub const CONFIG_PATH_VAR: &str = "WORKBENCH_CONFIG";

/// Overrides [`WorkbenchConfig::api_base_url`]
pub const API_BASE_URL_VAR: &str = "WORKBENCH_API_BASE_URL";

/// Overrides [`WorkbenchConfig::storage_path`]
pub const STORAGE_PATH_VAR: &str = "WORKBENCH_STORAGE_PATH";

/// Overrides [`WorkbenchConfig::log_filter`]
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`WorkbenchConfig`]
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that was parsed
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Workbench settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Base URL every remote request is resolved against
    pub api_base_url: String,
    /// File holding the persisted slices
    pub storage_path: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            storage_path: PathBuf::from("workbench-storage.json"),
            log_filter: "info,sliceflow::logger=debug".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl WorkbenchConfig {
    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the named file cannot be read or parsed, or
    /// if the final values fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        let config = config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply variable overrides; `lookup` maps a variable name to its value
    #[must_use]
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_BASE_URL_VAR) {
            self.api_base_url = url;
        }
        if let Some(path) = lookup(STORAGE_PATH_VAR) {
            self.storage_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup(LOG_FILTER_VAR) {
            self.log_filter = filter;
        }
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".to_string()));
        }
        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage_path must not be empty".to_string()));
        }
        Ok(())
    }

    /// [`Self::request_timeout_secs`] as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
