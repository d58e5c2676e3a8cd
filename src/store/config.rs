//! Store configuration.
//!
//! Defaults match the layout written by the librir native tools, so files
//! stay readable by both.

use crate::format::CompressionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for an attribute store session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Compression of large attribute strings.
    pub compression: CompressionConfig,
    /// First buffer size tried by the two-phase read protocol.
    pub initial_buffer_capacity: usize,
    /// fsync the new file before swapping it in.
    pub sync_on_commit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression: CompressionConfig::default(),
            initial_buffer_capacity: 200,
            sync_on_commit: true,
        }
    }
}

impl StoreConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_buffer_capacity == 0 {
            return Err(ConfigError::InvalidBufferCapacity);
        }
        let levels = zstd::compression_level_range();
        if self.compression.level != 0 && !levels.contains(&self.compression.level) {
            return Err(ConfigError::InvalidCompressionLevel(self.compression.level));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// `initial_buffer_capacity` is zero.
    #[error("initial buffer capacity must be non-zero")]
    InvalidBufferCapacity,
    /// Level outside the range supported by zstd.
    #[error("invalid zstd compression level {0}")]
    InvalidCompressionLevel(i32),
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// Config file is not valid TOML for [`FileConfig`].
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[store]` table.
    #[serde(default)]
    pub store: StoreConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.store.validate()?;
        Ok(config)
    }
}
