use crate::history::HISTORY_CAPACITY;
use crate::monitor::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Path of an optional JSON config file.
pub const CONFIG_ENV: &str = "POWER_MONITOR_CONFIG";
/// Overrides `poll_interval_ms`.
pub const INTERVAL_ENV: &str = "POWER_MONITOR_INTERVAL_MS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid poll interval '{0}'")]
    InvalidInterval(String),
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub poll_interval_ms: u64,
    pub history_capacity: usize,
    pub provider: ProviderKind,
    pub carbon_intensity: f64, // gCO2/kWh reported with every snapshot
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            history_capacity: HISTORY_CAPACITY,
            provider: ProviderKind::Auto,
            carbon_intensity: 100.0,
        }
    }
}

impl DashboardConfig {
    /// Reads the config file and interval override from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let interval = std::env::var(INTERVAL_ENV).ok();
        Self::resolve(path.as_deref(), interval.as_deref())
    }

    pub fn resolve(path: Option<&Path>, interval: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(raw) = interval {
            config.poll_interval_ms = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidInterval(raw.to_string()))?;
        }
        config.validate()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
