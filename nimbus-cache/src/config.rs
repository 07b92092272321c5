use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::{CacheConfig, CacheError};

/// Host configuration loaded by the `nimbus-cache` binary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NimbusConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// How often the host logs cache statistics
    pub report_interval_ms: u64,
    /// Synthetic entries inserted at start-up
    pub warmup_entries: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: 5000,
            warmup_entries: 0,
        }
    }
}

impl NimbusConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: NimbusConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Convert to a validated CacheConfig
    pub fn to_cache_config(&self) -> Result<CacheConfig, CacheError> {
        self.cache.validate()?;
        if self.host.report_interval_ms == 0 {
            return Err(CacheError::Config(
                "host.report_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(self.cache.clone())
    }

    pub fn json_logging(&self) -> bool {
        self.logging.format.eq_ignore_ascii_case("json")
    }
}
