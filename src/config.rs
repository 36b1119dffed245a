use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::PageOrder;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub scrapbox: ScrapboxConfig,
    pub backup: BackupConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapboxConfig {
    /// Project name as it appears in scrapbox.io URLs.
    pub project: String,
    /// Value of the `connect.sid` session cookie.
    pub session_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    /// Where downloaded `<timestamp>.json` files are kept.
    pub storage_directory: PathBuf,
    /// Git repository holding one commit per snapshot.
    pub repository: PathBuf,
    #[serde(default)]
    pub page_order: PageOrder,
    #[serde(default = "default_request_interval")]
    pub request_interval_secs: f64,
}

fn default_request_interval() -> f64 {
    3.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    #[serde(default = "default_parallel_limit")]
    pub parallel_limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            parallel_limit: default_parallel_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_parallel_limit() -> usize {
    5
}

fn default_timeout_secs() -> f64 {
    30.0
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.scrapbox.project.is_empty() {
        anyhow::bail!("scrapbox.project must not be empty");
    }
    if config.scrapbox.session_id.is_empty() {
        anyhow::bail!("scrapbox.session_id must not be empty");
    }
    if config.backup.request_interval_secs < 0.0 {
        anyhow::bail!("backup.request_interval_secs must be >= 0");
    }
    if config.probe.parallel_limit == 0 {
        anyhow::bail!("probe.parallel_limit must be >= 1");
    }
    if config.probe.timeout_secs <= 0.0 {
        anyhow::bail!("probe.timeout_secs must be > 0");
    }

    Ok(config)
}
