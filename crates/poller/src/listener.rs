//! Listener registration and fan-out
//!
//! The registry holds listeners weakly: it never keeps a listener alive,
//! and registrations whose listener has been dropped are pruned lazily.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use poll_core::watermark::format_timestamp;
use poll_core::{ChangeBatch, Item, ListenerError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::warn;

/// Fresh items discovered by one poll cycle
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Identity of the poller that discovered the items
    pub source: Arc<str>,
    pub items: ChangeBatch,
    pub discovered_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// `discovered_at` in the canonical watermark encoding
    pub fn discovered_at_string(&self) -> String {
        format_timestamp(self.discovered_at)
    }
}

/// Subscriber to change events
pub trait Listener: Send + Sync {
    fn on_new_items(&self, event: &ChangeEvent) -> Result<(), ListenerError>;
}

impl<F> Listener for F
where
    F: Fn(&ChangeEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_new_items(&self, event: &ChangeEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

struct Registration {
    key: usize,
    listener: Weak<dyn Listener>,
}

impl Registration {
    fn is_alive(&self) -> bool {
        self.listener.strong_count() > 0
    }
}

pub struct ListenerRegistry {
    source: Arc<str>,
    entries: RwLock<Vec<Registration>>,
}

/// Listeners are compared by allocation address
fn identity(listener: &Arc<dyn Listener>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

impl ListenerRegistry {
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Register `listener` at the end of the delivery order
    ///
    /// Returns `false` if it was already registered.
    pub fn subscribe(&self, listener: &Arc<dyn Listener>) -> bool {
        let key = identity(listener);
        let mut entries = self.entries.write();
        entries.retain(Registration::is_alive);

        if entries.iter().any(|entry| entry.key == key) {
            return false;
        }
        entries.push(Registration {
            key,
            listener: Arc::downgrade(listener),
        });
        true
    }

    /// Returns `false` if `listener` was not registered.
    pub fn unsubscribe(&self, listener: &Arc<dyn Listener>) -> bool {
        let key = identity(listener);
        let mut entries = self.entries.write();
        let position = entries.iter().position(|entry| entry.key == key);
        if let Some(index) = position {
            entries.remove(index);
        }
        entries.retain(Registration::is_alive);
        position.is_some()
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.entries.read().iter().filter(|entry| entry.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `batch` to every registered listener
    ///
    /// Delivery iterates a snapshot taken on entry, in registration order,
    /// with no lock held while listener code runs. A listener returning an
    /// error or panicking is logged and skipped.
    pub fn notify(&self, batch: ChangeBatch, discovered_at: DateTime<Utc>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if batch.is_empty() {
            return report;
        }

        let (snapshot, pruned) = self.snapshot();
        if pruned {
            self.entries.write().retain(Registration::is_alive);
        }
        if snapshot.is_empty() {
            return report;
        }

        let event = ChangeEvent {
            source: self.source.clone(),
            items: batch,
            discovered_at,
        };

        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_new_items(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!("Listener failed on {} new items: {}", event.items.len(), e);
                    report.failed += 1;
                }
                Err(_) => {
                    warn!("Listener panicked on {} new items", event.items.len());
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Live listeners, plus whether any dead registration was seen
    fn snapshot(&self) -> (Vec<Arc<dyn Listener>>, bool) {
        let entries = self.entries.read();
        let live: Vec<Arc<dyn Listener>> = entries
            .iter()
            .filter_map(|entry| entry.listener.upgrade())
            .collect();
        let pruned = live.len() < entries.len();
        (live, pruned)
    }
}

/// Item ids of a batch, for log lines
pub(crate) fn ids(items: &[Item]) -> Vec<i64> {
    items.iter().map(|item| item.id).collect()
}
