//! One poll cycle: fetch since the watermark, drop already-seen items,
//! notify listeners of the rest, advance the watermark

use crate::listener::{ids, DeliveryReport, ListenerRegistry};
use crate::scheduler::RunState;
use catalog::{CatalogError, Credential, RemoteCatalog};
use parking_lot::RwLock;
use poll_core::{ChangeBatch, Clock, Item, SeenSet, Watermark};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where and as whom to poll
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub endpoint: Option<String>,
    pub credential: Option<Credential>,
}

impl ConnectionSettings {
    /// The credential to poll with, or why polling is not possible
    fn usable_credential(&self) -> Result<Credential, SkipReason> {
        match self.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => {}
            _ => return Err(SkipReason::MissingEndpoint),
        }
        match &self.credential {
            Some(credential) if !credential.is_blank() => Ok(credential.clone()),
            _ => Err(SkipReason::MissingCredential),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRunning,
    MissingEndpoint,
    MissingCredential,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Guards prevented the cycle; nothing was touched
    Skipped(SkipReason),
    Completed {
        fetched: usize,
        fresh: usize,
        delivery: DeliveryReport,
    },
    /// The fetch failed; the watermark still advanced
    Failed(CatalogError),
}

#[derive(Debug)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Watermark after the cycle
    pub watermark: Watermark,
}

impl CycleReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Skipped(_))
    }

    /// Number of items surfaced to listeners by this cycle
    pub fn fresh(&self) -> usize {
        match self.outcome {
            CycleOutcome::Completed { fresh, .. } => fresh,
            _ => 0,
        }
    }
}

/// Change detector
///
/// Owns the seen-set. The watermark is shared so the host can read it (and
/// overwrite it) between cycles, but only `run_cycle` advances it.
pub struct ChangeDetector {
    catalog: Arc<dyn RemoteCatalog>,
    registry: Arc<ListenerRegistry>,
    settings: Arc<RwLock<ConnectionSettings>>,
    watermark: Arc<RwLock<Watermark>>,
    seen: SeenSet,
    clock: Arc<dyn Clock>,
}

impl ChangeDetector {
    pub fn new(
        catalog: Arc<dyn RemoteCatalog>,
        registry: Arc<ListenerRegistry>,
        settings: Arc<RwLock<ConnectionSettings>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            registry,
            settings,
            watermark: Arc::new(RwLock::new(Watermark::unset())),
            seen: SeenSet::new(),
            clock,
        }
    }

    /// Start from an existing watermark instead of an unset one
    pub fn with_watermark(self, watermark: Watermark) -> Self {
        *self.watermark.write() = watermark;
        self
    }

    pub fn watermark(&self) -> Watermark {
        *self.watermark.read()
    }

    pub(crate) fn watermark_handle(&self) -> Arc<RwLock<Watermark>> {
        self.watermark.clone()
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Run one poll cycle
    pub async fn run_cycle(&mut self, state: RunState) -> CycleReport {
        if state != RunState::Running {
            return self.skipped(SkipReason::NotRunning);
        }
        let usable = self.settings.read().usable_credential();
        let credential = match usable {
            Ok(credential) => credential,
            Err(reason) => return self.skipped(reason),
        };

        let since = {
            let mut watermark = self.watermark.write();
            watermark.initialize(self.clock.now());
            watermark.encode().unwrap_or_default()
        };

        let outcome = match self.catalog.fetch_since(&since, &credential).await {
            Ok(items) if items.is_empty() => {
                debug!("No items since {}", since);
                CycleOutcome::Completed {
                    fetched: 0,
                    fresh: 0,
                    delivery: DeliveryReport::default(),
                }
            }
            Ok(items) => {
                let fetched = items.len();
                let batch = self.filter_unseen(items);
                let fresh = batch.len();

                let delivery = if batch.is_empty() {
                    debug!("All {} fetched items already seen", fetched);
                    DeliveryReport::default()
                } else {
                    info!("Found {} new items: {:?}", fresh, ids(&batch));
                    self.registry.notify(batch, self.clock.now())
                };

                CycleOutcome::Completed { fetched, fresh, delivery }
            }
            Err(e) => {
                warn!("Fetch since {} failed: {}", since, e);
                CycleOutcome::Failed(e)
            }
        };

        let watermark = {
            let mut watermark = self.watermark.write();
            watermark.advance(self.clock.now());
            *watermark
        };

        CycleReport { outcome, watermark }
    }

    /// Keep items whose id was never seen, recording them as seen
    fn filter_unseen(&mut self, items: Vec<Item>) -> ChangeBatch {
        let seen = &mut self.seen;
        items.into_iter().filter(|item| seen.insert(item.id)).collect()
    }

    fn skipped(&self, reason: SkipReason) -> CycleReport {
        debug!("Poll cycle skipped: {:?}", reason);
        CycleReport {
            outcome: CycleOutcome::Skipped(reason),
            watermark: self.watermark(),
        }
    }
}
