//! Poll a feed and print new items as they appear

use crate::system_config;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use poll_core::ListenerError;
use poller::{ChangeEvent, CycleOutcome, Listener};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Prints each change event to stdout
struct ConsolePrinter;

impl Listener for ConsolePrinter {
    fn on_new_items(&self, event: &ChangeEvent) -> Result<(), ListenerError> {
        println!(
            "{} {} new item(s) from {}",
            event.discovered_at_string().dimmed(),
            event.items.len().bold(),
            event.source.cyan()
        );
        for item in &event.items {
            println!("  {} {}", format!("#{}", item.id).green(), item.metadata);
        }
        Ok(())
    }
}

pub async fn run(feed: Option<PathBuf>, interval: Option<i64>, since: Option<String>, once: bool) -> Result<()> {
    let mut config = system_config::load()?;
    if let Some(secs) = interval {
        config.poller.interval_secs = secs;
    }
    if let Some(since) = since {
        config.poller.last_checked = Some(since);
    }

    let poller = super::feed_poller(&config, feed)?;
    let printer: Arc<dyn Listener> = Arc::new(ConsolePrinter);
    poller.add_listener(&printer);

    poller.set_running(true);

    if once {
        let report = poller.poll_now().await;
        if let CycleOutcome::Failed(e) = &report.outcome {
            eprintln!("{} {}", "Poll failed:".red(), e);
        }
    } else {
        println!(
            "Watching {} every {}s (Ctrl-C to stop)",
            poller.endpoint().unwrap_or_default().cyan(),
            poller.interval().as_secs()
        );
        tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    }

    poller.set_running(false);
    poller.wait_idle().await;

    // Persist only the watermark; command-line overrides stay one-off
    let mut saved = system_config::load()?;
    saved.poller.last_checked = poller.last_checked();
    system_config::save(&saved)?;
    info!("Saved watermark {}", saved.poller.last_checked.as_deref().unwrap_or("<unset>"));

    println!("{} items seen", poller.seen_count().await);
    Ok(())
}
