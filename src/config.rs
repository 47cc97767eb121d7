/// Application configuration
///
/// Grid geometry, fetch behavior and compositing worker count, stored as
/// TOML in the user's config directory. Missing fields fall back to their
/// defaults, and a first run writes the default file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Grid geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Edge length of each square icon cell, in pixels
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,
    /// Gap around each cell, in pixels
    #[serde(default = "default_padding")]
    pub padding: u32,
}

/// Icon download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Prefix for relative icon paths in the catalog
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    /// Ceiling for a single icon download; exceeding it marks the item not found
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Image compositing settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Concurrent compositing jobs; defaults to the number of cores
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            icon_size: default_icon_size(),
            padding: default_padding(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: default_catalog_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProcessingConfig {
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}

fn default_columns() -> usize {
    7
}

fn default_icon_size() -> u32 {
    125
}

fn default_padding() -> u32 {
    2
}

fn default_catalog_base_url() -> String {
    "https://gameflip.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("inventory-grid/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Config {
    /// Load from the default location, writing defaults on first run
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `$XDG_CONFIG_HOME/inventory-grid/config.toml` on Linux
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("inventory-grid").join("config.toml"))
    }
}
