//! Node configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zephyr_snapshot::SnapshotConfig;

/// Default home directory name, relative to `$HOME`
pub const DEFAULT_HOME_DIR: &str = ".zephyr";

/// Config file name inside the home directory
pub const CONFIG_FILE: &str = "zephyr.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Node configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Data directory holding the chainstate, block files, and snapshots
    pub data_dir: PathBuf,
    /// Whether the node accepts inbound connections
    pub listen: bool,
    /// Snapshot subsystem settings
    pub snapshot: SnapshotConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_HOME_DIR).join("data"),
            listen: true,
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load the config file under `home`, or fall back to defaults rooted
    /// at `home` when no file exists yet
    pub fn load_or_default(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self {
                data_dir: home.join("data"),
                ..Self::default()
            })
        }
    }

    /// Write the configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert!(config.listen);
        assert!(config.snapshot.enabled);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);

        let mut config = NodeConfig::default();
        config.listen = false;
        config.snapshot.max_concurrent_transfers = 7;
        config.save(&path).expect("save");

        let loaded = NodeConfig::load(&path).expect("load");
        assert!(!loaded.listen);
        assert_eq!(loaded.snapshot.max_concurrent_transfers, 7);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().expect("tempdir");
        let config = NodeConfig::load_or_default(dir.path()).expect("defaults");
        assert_eq!(config.data_dir, dir.path().join("data"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "listen = false\n").expect("write");

        let config = NodeConfig::load(&path).expect("load");
        assert!(!config.listen);
        assert!(config.snapshot.enabled);
    }
}
