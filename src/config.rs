use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{HarnessError, Result};
use crate::loader::FixtureLoader;
use crate::models::{TableName, TieBreak};
use crate::provisioner::StoreImage;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    pub image: StoreImage,
    pub record_count: usize,
    /// Seed for the name source; unseeded names differ on every run
    pub seed: Option<u64>,
    pub table_name: String,
    /// Rows per INSERT statement
    pub batch_size: usize,
    pub readiness_timeout_secs: u64,
    pub max_connections: u32,
    pub tie_break: TieBreak,
    pub log: LogConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            image: StoreImage::default(),
            record_count: 100,
            seed: None,
            table_name: "test_table".to_string(),
            batch_size: 500,
            readiness_timeout_secs: 60,
            max_connections: 5,
            tie_break: TieBreak::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    /// `hourly`, `daily`, anything else means a single file
    pub rotation: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "seedcheck.log".to_string(),
            use_json: false,
            rotation: "never".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load `config/<env>.yaml`.
    pub fn load(env: &str) -> Result<Self> {
        Self::from_file(format!("config/{}.yaml", env))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            HarnessError::InvalidConfiguration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: HarnessConfig = serde_yaml::from_str(content).map_err(|e| {
            HarnessError::InvalidConfiguration(format!("Failed to parse config yaml: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_count == 0 {
            return Err(HarnessError::InvalidConfiguration(
                "record_count must be greater than zero".to_string(),
            ));
        }
        FixtureLoader::new(self.batch_size)?;
        if self.readiness_timeout_secs == 0 {
            return Err(HarnessError::InvalidConfiguration(
                "readiness_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(HarnessError::InvalidConfiguration(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if self.image.name.is_empty() || self.image.tag.is_empty() {
            return Err(HarnessError::InvalidConfiguration(
                "image name and tag must not be empty".to_string(),
            ));
        }
        self.table()?;
        Ok(())
    }

    pub fn table(&self) -> Result<TableName> {
        TableName::new(&self.table_name)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }
}
