//! Cache configuration via `vqcache.toml`
//!
//! Buffer sizing is read from a small TOML file. A default file is written on
//! first use; edit it and rebuild the queue to apply changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use vqcache_core::{Error, Result};
use vqcache_storage::{Buffer, VQueue};

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "vqcache.toml";

/// Buffer configuration loaded from `vqcache.toml`.
///
/// # Example
///
/// ```toml
/// insert_buffer_capacity = 1024
/// delete_buffer_capacity = 256
/// shard_amount = 64
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Initial capacity reserved for the insert buffer.
    #[serde(default)]
    pub insert_buffer_capacity: usize,
    /// Initial capacity reserved for the delete buffer.
    #[serde(default)]
    pub delete_buffer_capacity: usize,
    /// Shard count for both buffers. Must be a power of two greater than 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_amount: Option<usize>,
}

impl CacheConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `shard_amount` is not a power of two
    /// greater than 1.
    pub fn validate(&self) -> Result<()> {
        if let Some(shards) = self.shard_amount {
            if shards <= 1 || !shards.is_power_of_two() {
                return Err(Error::InvalidConfig(format!(
                    "shard_amount must be a power of two greater than 1, got {}",
                    shards
                )));
            }
        }
        Ok(())
    }

    /// Build an empty queue sized by this config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config does not validate.
    pub fn build_queue(&self) -> Result<VQueue> {
        self.validate()?;
        let (inserts, deletes) = match self.shard_amount {
            Some(shards) => (
                Buffer::with_capacity_and_shards(self.insert_buffer_capacity, shards),
                Buffer::with_capacity_and_shards(self.delete_buffer_capacity, shards),
            ),
            None => (
                Buffer::with_capacity(self.insert_buffer_capacity),
                Buffer::with_capacity(self.delete_buffer_capacity),
            ),
        };
        Ok(VQueue::with_buffers(inserts, deletes))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# vqcache configuration
#
# Initial capacity reserved for each buffer (default: 0).
# Raise these when the ingest rate between flushes is known.
insert_buffer_capacity = 0
delete_buffer_capacity = 0

# Shard count for both buffers. Must be a power of two greater than 1.
# Defaults to a value derived from the number of CPUs.
# shard_amount = 64
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, parsed or
    /// validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: CacheConfig = toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::InvalidConfig(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
