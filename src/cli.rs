use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

use crate::config::{ImportConfig, SinkConfig};
use crate::selection::Selections;
use crate::zip::ZipFileEntry;

#[derive(Parser, Debug)]
#[command(name = "zipwebp")]
#[command(version)]
#[command(about = "Import images from a ZIP archive as WebP", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipwebp assets.zip -d worlds/img                 convert every image into worlds/img\n  \
  zipwebp assets.zip '*.png' -x thumbs             only PNGs, skipping thumbnails\n  \
  zipwebp https://example.com/a.zip --prefix /VehicleImages/ --ext png\n  \
  zipwebp -l assets.zip                            list archive entries")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Entries to import (glob patterns, default: all)
    #[arg(value_name = "PATTERNS")]
    pub patterns: Vec<String>,

    /// Exclude entries that follow
    #[arg(short = 'x', value_name = "PATTERN", num_args = 1.., conflicts_with = "prefix")]
    pub exclude: Vec<String>,

    /// Import every file whose path contains this fragment
    #[arg(long, value_name = "FRAGMENT", conflicts_with = "patterns")]
    pub prefix: Option<String>,

    /// With --prefix, only files with this extension
    #[arg(long, value_name = "EXT", requires = "prefix")]
    pub ext: Option<String>,

    /// Destination folder
    #[arg(short = 'd', long = "dest", value_name = "FOLDER")]
    pub destination: Option<String>,

    /// TOML configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Store into this local directory
    #[arg(long, value_name = "DIR", group = "backend")]
    pub local_root: Option<PathBuf>,

    /// Upload to a storage endpoint
    #[arg(long, value_name = "URL", group = "backend")]
    pub storage_url: Option<String>,

    /// Upload through an asset-hosting API
    #[arg(long, value_name = "URL", group = "backend")]
    pub assets_url: Option<String>,

    /// Bearer token for --assets-url
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Keep a timestamped trace of every action
    #[arg(long)]
    pub verbose_logs: bool,

    /// Write the trace to this file (implies --verbose-logs)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// List archive entries and exit
    #[arg(short = 'l')]
    pub list: bool,

    /// Quiet mode
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.archive.starts_with("http://") || self.archive.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn verbose_logs(&self) -> bool {
        self.verbose_logs || self.log_file.is_some()
    }

    /// Configuration from the config file (or defaults) with flags applied on top.
    pub fn import_config(&self) -> Result<ImportConfig> {
        let mut config = match &self.config {
            Some(path) => ImportConfig::load(path)?,
            None => ImportConfig::default(),
        };

        if let Some(destination) = &self.destination {
            config.destination_folder = destination.clone();
        }
        if self.verbose_logs() {
            config.verbose_logs = true;
        }

        if let Some(root) = &self.local_root {
            config.sink = SinkConfig::Local {
                root: root.clone(),
                max_bytes: None,
            };
        } else if let Some(url) = &self.storage_url {
            config.sink = SinkConfig::Storage {
                upload_url: url.clone(),
                source: "data".to_string(),
                bucket: None,
            };
        } else if let Some(url) = &self.assets_url {
            config.sink = SinkConfig::Assets {
                api_url: url.clone(),
                api_key: self.api_key.clone(),
            };
        } else if let (Some(key), SinkConfig::Assets { api_key, .. }) = (&self.api_key, &mut config.sink) {
            *api_key = Some(key.clone());
        }

        if self.api_key.is_some() && !matches!(config.sink, SinkConfig::Assets { .. }) {
            bail!("--api-key only applies to the assets backend");
        }

        config.validate()?;
        Ok(config)
    }

    pub fn selections(&self, entries: &[ZipFileEntry]) -> Selections {
        match &self.prefix {
            Some(fragment) => Selections::Prefix {
                fragment: fragment.clone(),
                extension: self.ext.clone(),
            },
            None => Selections::from_patterns(entries, &self.patterns, &self.exclude),
        }
    }
}
