//! Sizer configuration, read from TOML.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for a size walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizerConfig {
    /// Concurrent directory expansions. 0 means unbounded.
    pub max_workers: usize,
    /// Give up after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Descend into entries whose name starts with `.`.
    pub include_hidden: bool,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            timeout_secs: None,
            include_hidden: false,
        }
    }
}

impl SizerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse sizer config")
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Load `<config_dir>/dirsize/config.toml` if it exists, else defaults.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dirsize").join("config.toml"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
