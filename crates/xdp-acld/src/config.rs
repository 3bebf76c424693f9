//! Configuration file support for xdp-acld
//!
//! Loads and validates daemon configuration from TOML files.
//! Default location: /etc/xdp-acl/xdp-acld.toml
//!
//! ```toml
//! [dataplane]
//! workers = 4
//! batch_size = 256
//! max_tables = 128
//!
//! [rules]
//! default_file = "/etc/xdp-acl/rules.json"
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use acl_dataplane::MAX_TABLES;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/xdp-acl/xdp-acld.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Classification data path configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataplaneConfig {
    /// Number of classification workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Frames classified per snapshot
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of tables the control plane may allocate
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,
}

/// Rule source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rules file used when no `--rules` flag is given
    #[serde(default = "default_rules_file")]
    pub default_file: PathBuf,

    /// Seed for table ID allocation (random when absent)
    #[serde(default)]
    pub table_id_seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete xdp-acld configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub dataplane: DataplaneConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_workers() -> usize {
    4
}

fn default_batch_size() -> usize {
    256
}

fn default_max_tables() -> usize {
    MAX_TABLES
}

fn default_rules_file() -> PathBuf {
    PathBuf::from("/etc/xdp-acl/rules.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for DataplaneConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            max_tables: default_max_tables(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            default_file: default_rules_file(),
            table_id_seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataplane.workers == 0 || self.dataplane.workers > 1024 {
            return Err(ConfigError::invalid(
                "dataplane.workers",
                format!("must be 1-1024, got {}", self.dataplane.workers),
            ));
        }

        if self.dataplane.batch_size == 0 {
            return Err(ConfigError::invalid("dataplane.batch_size", "must be > 0"));
        }

        if self.dataplane.max_tables == 0 || self.dataplane.max_tables > MAX_TABLES {
            return Err(ConfigError::invalid(
                "dataplane.max_tables",
                format!("must be 1-{}, got {}", MAX_TABLES, self.dataplane.max_tables),
            ));
        }

        Ok(())
    }
}
