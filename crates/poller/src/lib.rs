//! Change detection loop for remote catalogs
//!
//! This crate provides:
//! - Listener registration with isolated fan-out
//! - The poll cycle: since-watermark fetch, dedup, notify, advance
//! - A single-flight periodic scheduler with start/stop/configure
//! - [`Poller`], the host-facing facade tying them together

pub mod component;
pub mod detector;
pub mod listener;
pub mod scheduler;

// Re-exports
pub use component::{Poller, PollerOptions};
pub use detector::{ChangeDetector, ConnectionSettings, CycleOutcome, CycleReport, SkipReason};
pub use listener::{ChangeEvent, DeliveryReport, Listener, ListenerRegistry};
pub use scheduler::{PollingScheduler, RunState};
