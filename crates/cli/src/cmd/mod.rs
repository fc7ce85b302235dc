//! Command implementations

pub mod config;
pub mod fetch;
pub mod watch;

use anyhow::{Context, Result};
use catalog::{Credential, FeedCatalog};
use poller::{Poller, PollerOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::system_config::SystemConfig;

/// Feed catalogs accept any token; used when none is configured
const LOCAL_CREDENTIAL: &str = "local";

/// Build a poller over the feed named on the command line or in config
pub(crate) fn feed_poller(config: &SystemConfig, feed: Option<PathBuf>) -> Result<Poller> {
    let endpoint = feed
        .map(|path| path.display().to_string())
        .or_else(|| config.poller.endpoint.clone())
        .context("No feed given. Pass --feed or set poller.endpoint (mpoll config set poller.endpoint <path>)")?;

    let credential = config
        .poller
        .credential
        .clone()
        .unwrap_or_else(|| LOCAL_CREDENTIAL.to_string());

    let options = PollerOptions {
        source: config.poller.source_name.clone(),
        endpoint: Some(endpoint.clone()),
        credential: Some(Credential::new(credential)),
        interval_secs: config.poller.interval_secs,
        last_checked: config.watermark()?,
        ..PollerOptions::default()
    };

    Ok(Poller::new(Arc::new(FeedCatalog::new(endpoint)), options, Handle::current()))
}
