//! Configuration resolution for skislope-elevation
//!
//! Server URL priority: command line → ENV (`SKISLOPE_ELEVATION_URL`) →
//! TOML → built-in default. Every other setting comes from TOML or its
//! default.

use crate::services::grid_cache::DEFAULT_CACHE_CAPACITY;
use crate::services::progress_tracker::TrackerSettings;
use serde::{Deserialize, Serialize};
use skislope_common::config::{load_toml_config, resolve_config_path, LoggingConfig};
use skislope_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const ENV_CONFIG_PATH: &str = "SKISLOPE_CONFIG";
/// Environment variable overriding the server URL
pub const ENV_SERVER_URL: &str = "SKISLOPE_ELEVATION_URL";
/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "elevation.toml";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8081";

/// Elevation pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// Base URL of the elevation server
    pub server_url: String,
    /// Whole-request timeout for remote calls
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub warmup_interval_ms: u64,
    pub warmup_window_ms: u64,
    pub max_poll_attempts: u32,
    /// Grid cache size; 0 is unbounded
    pub cache_capacity: usize,
    /// Share one fetch between concurrent identical requests
    pub dedupe_in_flight: bool,
    /// Event bus buffer per subscriber
    pub event_capacity: usize,
    pub logging: LoggingConfig,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: 300,
            poll_interval_ms: 500,
            warmup_interval_ms: 250,
            warmup_window_ms: 5000,
            max_poll_attempts: 600,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            dedupe_in_flight: true,
            event_capacity: 100,
            logging: LoggingConfig::default(),
        }
    }
}

impl ElevationConfig {
    /// Resolve configuration from all tiers
    ///
    /// A config file named on the command line or in the environment must
    /// exist; a missing default file is not an error.
    pub fn resolve(cli_config: Option<&Path>, cli_server_url: Option<&str>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_config, ENV_CONFIG_PATH, CONFIG_FILE_NAME) {
            Some(path) => {
                let config = Self::load(&path)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        let env_url = std::env::var(ENV_SERVER_URL)
            .ok()
            .filter(|url| !url.trim().is_empty());

        if cli_server_url.is_some() && env_url.is_some() {
            warn!(
                "Server URL set on command line and in {}. Using command line (highest priority).",
                ENV_SERVER_URL
            );
        }

        if let Some(url) = cli_server_url {
            info!("Server URL from command line");
            config.server_url = url.to_string();
        } else if let Some(url) = env_url {
            info!("Server URL from environment variable");
            config.server_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read one TOML file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        load_toml_config(path)
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.server_url)
            .map_err(|e| Error::Config(format!("Invalid server_url {:?}: {}", self.server_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "server_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 || self.warmup_interval_ms == 0 {
            return Err(Error::Config("poll intervals must be positive".to_string()));
        }
        if self.max_poll_attempts == 0 {
            return Err(Error::Config("max_poll_attempts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            warmup_interval: Duration::from_millis(self.warmup_interval_ms),
            warmup_window: Duration::from_millis(self.warmup_window_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    /// Log file from config, if any
    pub fn log_file(&self) -> Option<&PathBuf> {
        self.logging.file.as_ref()
    }
}
