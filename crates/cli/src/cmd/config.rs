//! Configuration management command
//!
//! Provides CLI interface to view and edit the poller configuration.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

const KEYS: &[&str] = &[
    "poller.endpoint",
    "poller.interval_secs",
    "poller.credential",
    "poller.last_checked",
    "poller.source_name",
];

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    println!("{}", "Poller Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[poller]".yellow());
    for key in KEYS {
        let value = display_value(&config, key)?;
        println!("  {} = {}", key.trim_start_matches("poller.").cyan(), value);
    }

    if config.poller.interval_secs <= 0 {
        println!(
            "\n{}",
            format!(
                "interval_secs = {} is not positive; polling uses 10s",
                config.poller.interval_secs
            )
            .yellow()
        );
    }

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", raw_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
///
/// An empty value clears optional keys.
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    apply(&mut config, key, value)?;

    config.validate().context("Invalid configuration value")?;
    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), display_value(&config, key)?);
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Unknown config key: {}. Use 'mpoll config list' to see available keys.",
        key
    )
}

fn optional(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn apply(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    let poller = &mut config.poller;
    match key {
        "poller.endpoint" => poller.endpoint = optional(value),
        "poller.interval_secs" => {
            poller.interval_secs = value
                .parse()
                .context("Invalid value: must be an integer number of seconds")?;
        }
        "poller.credential" => poller.credential = optional(value),
        "poller.last_checked" => poller.last_checked = optional(value),
        "poller.source_name" => poller.source_name = value.to_string(),
        _ => return Err(unknown_key(key)),
    }
    Ok(())
}

fn raw_value(config: &SystemConfig, key: &str) -> Result<String> {
    let poller = &config.poller;
    let value = match key {
        "poller.endpoint" => poller.endpoint.clone().unwrap_or_default(),
        "poller.interval_secs" => poller.interval_secs.to_string(),
        "poller.credential" => poller.credential.clone().unwrap_or_default(),
        "poller.last_checked" => poller.last_checked.clone().unwrap_or_default(),
        "poller.source_name" => poller.source_name.clone(),
        _ => return Err(unknown_key(key)),
    };
    Ok(value)
}

/// Like `raw_value`, but never prints the credential
fn display_value(config: &SystemConfig, key: &str) -> Result<String> {
    if key == "poller.credential" {
        return Ok(match &config.poller.credential {
            Some(_) => "<set>".to_string(),
            None => "<unset>".to_string(),
        });
    }
    let value = raw_value(config, key)?;
    Ok(if value.is_empty() { "<unset>".to_string() } else { value })
}
