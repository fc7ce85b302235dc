//! Shared fixtures for poller integration tests

use async_trait::async_trait;
use catalog::{Credential, MemoryCatalog, RemoteCatalog, Result};
use parking_lot::Mutex;
use poll_core::{Item, ListenerError};
use poller::{ChangeEvent, Listener, Poller, PollerOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub const TOKEN: &str = "tok";

/// Catalog whose `fetch_since` takes `delay` to answer
pub struct SlowCatalog {
    pub inner: MemoryCatalog,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub completed: AtomicUsize,
}

impl SlowCatalog {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryCatalog::new().with_token(TOKEN),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteCatalog for SlowCatalog {
    async fn fetch_since(&self, since: &str, credential: &Credential) -> Result<Vec<Item>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        let result = self.inner.fetch_since(since, credential).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn fetch_all(&self, credential: &Credential) -> Result<Vec<Item>> {
        self.inner.fetch_all(credential).await
    }
}

/// Listener recording the ids of every batch it receives
#[derive(Default)]
pub struct Recorder {
    pub batches: Mutex<Vec<Vec<i64>>>,
}

impl Recorder {
    pub fn delivered_ids(&self) -> Vec<i64> {
        self.batches.lock().iter().flatten().copied().collect()
    }
}

impl Listener for Recorder {
    fn on_new_items(&self, event: &ChangeEvent) -> std::result::Result<(), ListenerError> {
        self.batches
            .lock()
            .push(event.items.iter().map(|item| item.id).collect());
        Ok(())
    }
}

pub fn items(ids: &[i64]) -> Vec<Item> {
    ids.iter().map(|&id| Item::new(id)).collect()
}

pub fn new_poller(catalog: Arc<dyn RemoteCatalog>, interval_secs: i64) -> Poller {
    let options = PollerOptions {
        source: "test-poller".into(),
        endpoint: Some("memory://catalog".into()),
        credential: Some(Credential::new(TOKEN)),
        interval_secs,
        ..PollerOptions::default()
    };
    Poller::new(catalog, options, Handle::current())
}

pub fn recorder(poller: &Poller) -> (Arc<Recorder>, Arc<dyn Listener>) {
    let recorder = Arc::new(Recorder::default());
    let listener: Arc<dyn Listener> = recorder.clone();
    poller.add_listener(&listener);
    (recorder, listener)
}

/// Let paused time run forward by `secs` seconds
pub async fn elapse(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}
