use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::export::DEFAULT_JPEG_QUALITY;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "exifcheck.yaml";

/// Output format of the `extract` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// How `extract` prints metadata
    #[serde(default)]
    pub output: OutputFormat,
    /// Shown in place of absent metadata fields
    #[serde(default = "default_not_available")]
    pub not_available: String,
    /// Quality used when exporting to JPEG (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Whether `scan` walks sub-folders
    #[serde(default)]
    pub recursive_scan: bool,
}

fn default_not_available() -> String {
    "Not available".to_string()
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputFormat::Text,
            not_available: default_not_available(),
            jpeg_quality: default_jpeg_quality(),
            recursive_scan: false,
        }
    }
}

impl Config {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        Ok(config)
    }

    pub fn get_config_path(config_arg: &Option<PathBuf>) -> PathBuf {
        config_arg
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load the config for a command.
    ///
    /// A missing default config falls back to built-in defaults; a config
    /// path given explicitly must exist.
    pub fn resolve(config_arg: &Option<PathBuf>) -> Result<Self> {
        let path = Self::get_config_path(config_arg);

        if path.exists() {
            return Self::load_from_file(&path);
        }
        if config_arg.is_some() {
            anyhow::bail!(
                "Config file not found at {}. Run 'exifcheck init' to create one.",
                path.display()
            );
        }
        Ok(Self::default())
    }
}
