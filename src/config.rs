//! TOML configuration parsing and validation.
//!
//! Only `[db]` and `[server]` are required; every other section falls back
//! to defaults that reproduce the canonical four-column contract.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::decode::{ColumnMap, DecodeOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_csv_suffix")]
    pub csv_suffix: String,
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            csv_suffix: default_csv_suffix(),
            max_entry_bytes: default_max_entry_bytes(),
        }
    }
}

fn default_csv_suffix() -> String {
    ".csv".to_string()
}
fn default_max_entry_bytes() -> u64 {
    64 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsvConfig {
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub check_header: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            check_header: false,
        }
    }
}

fn default_columns() -> Vec<String> {
    ColumnMap::CANONICAL.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ValidationConfig {
    /// Reject negative prices while decoding instead of leaving it to the
    /// store's CHECK constraint.
    #[serde(default)]
    pub reject_negative_prices: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    /// Read aggregates inside the insert transaction, before commit.
    #[serde(default)]
    pub consistent_aggregates: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_entry_name")]
    pub entry_name: String,
    #[serde(default = "default_download_name")]
    pub download_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            entry_name: default_entry_name(),
            download_name: default_download_name(),
        }
    }
}

fn default_entry_name() -> String {
    "data.csv".to_string()
}
fn default_download_name() -> String {
    "data.zip".to_string()
}

impl Config {
    /// Decoder settings derived from `[csv]` and `[validation]`.
    pub fn decode_options(&self) -> Result<DecodeOptions> {
        let columns = ColumnMap::from_names(&self.csv.columns)?;
        Ok(DecodeOptions {
            columns,
            check_header: self.csv.check_header,
            reject_negative_prices: self.validation.reject_negative_prices,
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }

    if config.archive.csv_suffix.is_empty() {
        bail!("archive.csv_suffix must not be empty");
    }
    if config.archive.max_entry_bytes == 0 {
        bail!("archive.max_entry_bytes must be > 0");
    }

    config
        .decode_options()
        .with_context(|| "Invalid csv.columns")?;

    if config.export.entry_name.is_empty() {
        bail!("export.entry_name must not be empty");
    }
    if config.export.download_name.is_empty() {
        bail!("export.download_name must not be empty");
    }

    Ok(())
}
