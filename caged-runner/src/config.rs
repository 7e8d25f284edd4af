//! Serializable pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use caged_core::data::{DEFAULT_BASE_URL, DEFAULT_ROW_CAP};

/// Default number of months in a window.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Everything needed to build a window, loaded from TOML.
///
/// Every field has a default, so an empty file (or no file) is valid:
///
/// ```toml
/// base_url = "ftp://ftp.mtps.gov.br/pdet/microdados/NOVO%20CAGED"
/// cache_dir = "data"
/// row_cap = 100000
/// fetch_timeout_secs = 300
/// extract_timeout_secs = 600
/// window_size = 3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Remote root; `ftp`, `ftps`, `http` and `https` are accepted.
    pub base_url: String,

    /// Flat directory holding archives and extracted files.
    pub cache_dir: PathBuf,

    /// Maximum rows read per month.
    pub row_cap: usize,

    /// Deadline for one archive download. HTTP applies it to the whole
    /// request; FTP checks it between reads and bounds each socket read by it.
    pub fetch_timeout_secs: u64,

    pub extract_timeout_secs: u64,

    /// Months per window, ending at the requested month.
    pub window_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from("data"),
            row_cap: DEFAULT_ROW_CAP,
            fetch_timeout_secs: 300,
            extract_timeout_secs: 600,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        if self.row_cap == 0 {
            return Err(ConfigError::Invalid("row_cap must be at least 1".into()));
        }
        if self.fetch_timeout_secs == 0 || self.extract_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}
