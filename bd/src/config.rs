//! batchd configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::processor::ProcessorConfig;
use crate::store::DEFAULT_BATCH_SIZE;

/// Largest member id accepted over HTTP unless configured otherwise
pub const DEFAULT_MAX_ID: u64 = 1_000_000_007;

/// Main batchd configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,

    /// Ingestion splitting and validation
    pub ingest: IngestConfig,

    /// Drain loop timings
    pub processor: ProcessorConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: String,

    /// Directory for log files; logs go to stderr when unset
    #[serde(rename = "log-dir")]
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ingest: IngestConfig::default(),
            processor: ProcessorConfig::default(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load the daemon configuration
    ///
    /// An explicit `--config` path must exist and parse. Without one, the first
    /// readable file among `./.batchd.yml` and `<config dir>/batchd/batchd.yml`
    /// wins; a file that fails to parse is logged and skipped. With neither,
    /// built-in defaults apply.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Per-deployment override next to the working directory
        let local_config = PathBuf::from(".batchd.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("batchd").join("batchd.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ingest.batch_size == 0 {
            return Err(eyre::eyre!("ingest.batch-size must be at least 1"));
        }
        if self.ingest.max_id == 0 {
            return Err(eyre::eyre!("ingest.max-id must be at least 1"));
        }
        Ok(())
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum member ids per batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Largest member id accepted over HTTP
    #[serde(rename = "max-id")]
    pub max_id: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_id: DEFAULT_MAX_ID,
        }
    }
}
