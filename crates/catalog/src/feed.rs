//! JSON feed file catalog
//!
//! The feed is a JSON array of items, re-read on every fetch so that an
//! external process can append to it while the poller runs:
//!
//! ```json
//! [
//!   { "id": 1, "added_at": "2024-05-01T12:00:00Z", "metadata": { "title": "a" } },
//!   { "id": 2, "metadata": { "title": "b" } }
//! ]
//! ```
//!
//! Items without `added_at` are returned by every `fetch_since`.

use crate::{CatalogError, Credential, RemoteCatalog, Result};
use async_trait::async_trait;
use poll_core::watermark::parse_timestamp;
use poll_core::Item;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FeedCatalog {
    path: PathBuf,
}

impl FeedCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Item>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::Transport(format!("{}: {}", self.path.display(), e)))?;

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw)
            .map_err(|e| CatalogError::Transport(format!("malformed feed {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl RemoteCatalog for FeedCatalog {
    async fn fetch_since(&self, since: &str, _credential: &Credential) -> Result<Vec<Item>> {
        let since = parse_timestamp(since).map_err(|e| CatalogError::Transport(e.to_string()))?;
        let items = self.load().await?;
        let total = items.len();

        let recent: Vec<Item> = items
            .into_iter()
            .filter(|item| item.added_at.map_or(true, |added| added >= since))
            .collect();

        debug!("Feed {}: {} of {} items since {}", self.path.display(), recent.len(), total, since);
        Ok(recent)
    }

    async fn fetch_all(&self, _credential: &Credential) -> Result<Vec<Item>> {
        self.load().await
    }
}
