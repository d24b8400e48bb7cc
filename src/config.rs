//! Node configuration
//!
//! Consensus parameters are fixed at startup and read-only afterwards. The
//! whole configuration can be loaded from a TOML file; missing keys fall
//! back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default block reward in minor units
pub const DEFAULT_BLOCK_REWARD: u64 = 1000;

/// Default number of leading zero hex digits required of a block hash
pub const DEFAULT_DIFFICULTY: u32 = 1;

/// Default minimum of non-coinbase transactions per block
pub const DEFAULT_TX_MINIMUM: usize = 0;

/// Default maximum of non-coinbase transactions per block
pub const DEFAULT_TX_MAXIMUM: usize = 10;

/// A SHA-256 digest has 64 hex digits
pub const MAX_DIFFICULTY: u32 = 64;

/// Default API port
pub const DEFAULT_API_PORT: u16 = 1337;

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Cannot encode TOML: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Invalid parameter: {0}")]
    Invalid(String),
}

/// Consensus rules every block is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Newly minted value per block, in minor units
    #[serde(rename = "reward")]
    pub block_reward: u64,
    /// Leading zero hex digits required of a block hash
    pub difficulty: u32,
    /// Minimum non-coinbase transactions per block
    pub tx_minimum: usize,
    /// Maximum non-coinbase transactions per block
    pub tx_maximum: usize,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            block_reward: DEFAULT_BLOCK_REWARD,
            difficulty: DEFAULT_DIFFICULTY,
            tx_minimum: DEFAULT_TX_MINIMUM,
            tx_maximum: DEFAULT_TX_MAXIMUM,
        }
    }
}

impl ConsensusParams {
    /// Check the parameters are internally consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tx_minimum > self.tx_maximum {
            return Err(ConfigError::Invalid(format!(
                "tx_minimum {} exceeds tx_maximum {}",
                self.tx_minimum, self.tx_maximum
            )));
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::Invalid(format!(
                "difficulty {} exceeds {}",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        Ok(())
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
        }
    }
}

/// HTTP API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_API_PORT,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub consensus: ConsensusParams,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

impl NodeConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(text)?;
        config.consensus.validate()?;
        Ok(config)
    }

    /// Load a configuration file, or defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
