//! Host-facing poller
//!
//! Bundles catalog, registry, detector and scheduler behind the property
//! surface a host configures: endpoint, interval, credential, running flag
//! and last-checked watermark. Also forwards the catalog's non-polling
//! operations using the stored credential.

use crate::detector::{ChangeDetector, ConnectionSettings, CycleReport};
use crate::listener::{Listener, ListenerRegistry};
use crate::scheduler::PollingScheduler;
use catalog::{CatalogError, Credential, RemoteCatalog};
use parking_lot::RwLock;
use poll_core::{Clock, Item, ItemId, SystemClock, Watermark, WatermarkError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

/// Construction options for [`Poller`]
#[derive(Clone)]
pub struct PollerOptions {
    /// Identity reported as the source of change events
    pub source: String,
    pub endpoint: Option<String>,
    pub credential: Option<Credential>,
    /// Seconds between cycles; non-positive means the default
    pub interval_secs: i64,
    /// Resume point; initialized to "now" on first start if absent
    pub last_checked: Option<Watermark>,
    pub clock: Arc<dyn Clock>,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            source: "poller".to_string(),
            endpoint: None,
            credential: None,
            interval_secs: 0,
            last_checked: None,
            clock: Arc::new(SystemClock),
        }
    }
}

pub struct Poller {
    catalog: Arc<dyn RemoteCatalog>,
    registry: Arc<ListenerRegistry>,
    settings: Arc<RwLock<ConnectionSettings>>,
    watermark: Arc<RwLock<Watermark>>,
    scheduler: PollingScheduler,
}

impl Poller {
    pub fn new(catalog: Arc<dyn RemoteCatalog>, options: PollerOptions, runtime: Handle) -> Self {
        let registry = Arc::new(ListenerRegistry::new(options.source));
        let settings = Arc::new(RwLock::new(ConnectionSettings {
            endpoint: options.endpoint,
            credential: options.credential,
        }));

        let detector = ChangeDetector::new(catalog.clone(), registry.clone(), settings.clone(), options.clock)
            .with_watermark(options.last_checked.unwrap_or_default());
        let watermark = detector.watermark_handle();

        let scheduler = PollingScheduler::new(detector, runtime);
        scheduler.configure(options.interval_secs);

        Self {
            catalog,
            registry,
            settings,
            watermark,
            scheduler,
        }
    }

    pub fn endpoint(&self) -> Option<String> {
        self.settings.read().endpoint.clone()
    }

    pub fn set_endpoint(&self, endpoint: Option<String>) {
        self.settings.write().endpoint = endpoint;
    }

    pub fn credential(&self) -> Option<Credential> {
        self.settings.read().credential.clone()
    }

    pub fn set_credential(&self, credential: Option<Credential>) {
        self.settings.write().credential = credential;
    }

    pub fn interval(&self) -> Duration {
        self.scheduler.interval()
    }

    pub fn set_interval(&self, interval_secs: i64) {
        self.scheduler.configure(interval_secs);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn set_running(&self, running: bool) {
        if running {
            self.scheduler.start();
        } else {
            self.scheduler.stop();
        }
    }

    pub fn watermark(&self) -> Watermark {
        *self.watermark.read()
    }

    /// Last-checked watermark in canonical form
    pub fn last_checked(&self) -> Option<String> {
        self.watermark.read().encode()
    }

    /// Overwrite the watermark from its textual form
    pub fn set_last_checked(&self, value: &str) -> Result<(), WatermarkError> {
        let parsed = Watermark::parse(value)?;
        *self.watermark.write() = parsed;
        Ok(())
    }

    pub fn add_listener(&self, listener: &Arc<dyn Listener>) -> bool {
        self.registry.subscribe(listener)
    }

    pub fn remove_listener(&self, listener: &Arc<dyn Listener>) -> bool {
        self.registry.unsubscribe(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Poll immediately, outside the tick schedule
    pub async fn poll_now(&self) -> CycleReport {
        self.scheduler.run_once().await
    }

    /// Wait for an in-flight cycle, if any, to finish
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    pub async fn seen_count(&self) -> usize {
        self.scheduler.seen_count().await
    }

    /// Log in and keep the issued credential for subsequent calls
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential, CatalogError> {
        let credential = self.catalog.login(email, password).await?;
        self.set_credential(Some(credential.clone()));
        info!("Logged in as {}", email);
        Ok(credential)
    }

    pub async fn nickname(&self, user_id: i64) -> Result<String, CatalogError> {
        let credential = self.require_credential()?;
        self.catalog.resolve_nickname(user_id, &credential).await
    }

    pub async fn fetch_all(&self) -> Result<Vec<Item>, CatalogError> {
        let credential = self.require_credential()?;
        self.catalog.fetch_all(&credential).await
    }

    pub async fn download(&self, id: ItemId, destination: &Path) -> Result<(), CatalogError> {
        let credential = self.require_credential()?;
        self.catalog.download(id, destination, &credential).await
    }

    pub async fn upload(&self, file: &Path, origin_url: &str) -> Result<String, CatalogError> {
        let credential = self.require_credential()?;
        self.catalog.upload(file, origin_url, &credential).await
    }

    fn require_credential(&self) -> Result<Credential, CatalogError> {
        match self.credential() {
            Some(credential) if !credential.is_blank() => Ok(credential),
            _ => Err(CatalogError::Auth("not logged in".into())),
        }
    }
}
