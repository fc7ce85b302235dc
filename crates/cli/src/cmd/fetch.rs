//! Print every item in the feed

use crate::system_config;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(feed: Option<PathBuf>) -> Result<()> {
    let config = system_config::load()?;
    let poller = super::feed_poller(&config, feed)?;

    let items = poller.fetch_all().await?;
    if items.is_empty() {
        println!("{}", "Feed is empty".dimmed());
        return Ok(());
    }

    for item in &items {
        let added = item
            .added_at
            .map(poll_core::watermark::format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        println!("{} {} {}", format!("#{}", item.id).cyan(), added.dimmed(), item.metadata);
    }
    println!("\n{} items", items.len().bold());

    Ok(())
}
