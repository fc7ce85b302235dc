//! System configuration file
//!
//! Stored as TOML at `<config dir>/mpoll/config.toml`, or at the path in
//! `MPOLL_CONFIG` when set. A missing file means all defaults.

use anyhow::{Context, Result};
use poll_core::{Watermark, DEFAULT_INTERVAL_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "MPOLL_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub poller: PollerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Catalog location (for `mpoll`, the feed file path)
    pub endpoint: Option<String>,
    /// Seconds between polls; non-positive means 10
    pub interval_secs: i64,
    /// Opaque catalog token
    pub credential: Option<String>,
    /// Watermark saved by the last `watch` run
    pub last_checked: Option<String>,
    /// Source identity reported with change events
    pub source_name: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            interval_secs: DEFAULT_INTERVAL_SECS as i64,
            credential: None,
            last_checked: None,
            source_name: "mpoll".to_string(),
        }
    }
}

impl SystemConfig {
    /// Reject values that cannot be substituted by a default
    pub fn validate(&self) -> Result<()> {
        if let Some(last_checked) = &self.poller.last_checked {
            Watermark::parse(last_checked).context("poller.last_checked is not an RFC 3339 timestamp")?;
        }
        if self.poller.source_name.trim().is_empty() {
            anyhow::bail!("poller.source_name must not be empty");
        }
        Ok(())
    }

    /// Saved watermark, if any
    pub fn watermark(&self) -> Result<Option<Watermark>> {
        self.poller
            .last_checked
            .as_deref()
            .map(Watermark::parse)
            .transpose()
            .context("Invalid poller.last_checked")
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("mpoll").join("config.toml"))
}

pub fn load() -> Result<SystemConfig> {
    let path = config_file_path().context("Could not determine config file path")?;
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<SystemConfig> {
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(config, &path)
}

pub fn save_to(config: &SystemConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let serialized = toml::to_string_pretty(config).context("Failed to serialize config")?;

    // Atomic replace via a sibling temp file
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, serialized).context("Failed to write config")?;
    std::fs::rename(&tmp, path).context("Failed to replace config")?;
    Ok(())
}

pub fn init_if_missing() -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save_to(&SystemConfig::default(), &path)?;
    }
    Ok(())
}

pub fn example_config() -> &'static str {
    r#"# mpoll configuration

[poller]
# Feed file polled by `mpoll watch`
endpoint = "/var/lib/catalog/feed.json"

# Seconds between polls (values <= 0 mean 10)
interval_secs = 10

# Catalog token, if the catalog needs one
# credential = "..."

# Resume point, written back by `mpoll watch` on exit
# last_checked = "2024-05-01T12:00:00.000000Z"

source_name = "mpoll"
"#
}
