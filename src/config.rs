//! Import configuration.
//!
//! Everything the pipeline needs from its surroundings is passed in through
//! [`ImportConfig`]; nothing is read from process-wide state.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DESTINATION_FOLDER: &str = "modules/webp-converter/";

/// Settings of one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Folder under which converted images are stored.
    pub destination_folder: String,
    /// Keep a timestamped diagnostic line per pipeline action.
    pub verbose_logs: bool,
    /// Upload backend.
    pub sink: SinkConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            destination_folder: DEFAULT_DESTINATION_FOLDER.to_string(),
            verbose_logs: false,
            sink: SinkConfig::default(),
        }
    }
}

/// Which upload backend to use and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Plain directory on this machine.
    Local {
        root: PathBuf,
        #[serde(default)]
        max_bytes: Option<usize>,
    },
    /// Generic storage endpoint (multipart `source`/`target`/`upload`).
    Storage {
        upload_url: String,
        #[serde(default = "default_storage_source")]
        source: String,
        #[serde(default)]
        bucket: Option<String>,
    },
    /// Hosted asset API.
    Assets {
        api_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

fn default_storage_source() -> String {
    "data".to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Local {
            root: PathBuf::from("."),
            max_bytes: None,
        }
    }
}

impl ImportConfig {
    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ImportConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.destination_folder.trim().is_empty() {
            bail!("destination_folder cannot be empty");
        }
        match &self.sink {
            SinkConfig::Storage { upload_url, .. } if upload_url.trim().is_empty() => {
                bail!("storage upload_url cannot be empty")
            }
            SinkConfig::Assets { api_url, .. } if api_url.trim().is_empty() => {
                bail!("assets api_url cannot be empty")
            }
            _ => Ok(()),
        }
    }
}
