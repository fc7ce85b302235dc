//! Core primitives for catalog polling
//!
//! This crate provides:
//! - Catalog items and change batches
//! - The watermark cursor and its canonical timestamp encoding
//! - The seen-set deduplication ledger
//! - Clock abstraction (system and manual clocks)

pub mod clock;
pub mod error;
pub mod item;
pub mod seen;
pub mod watermark;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ListenerError, WatermarkError};
pub use item::{ChangeBatch, Item, ItemId};
pub use seen::SeenSet;
pub use watermark::Watermark;

/// Default polling interval in seconds, used whenever a non-positive
/// interval is configured.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Normalize a configured polling interval.
///
/// Non-positive values fall back to [`DEFAULT_INTERVAL_SECS`].
pub fn normalize_interval(interval_secs: i64) -> std::time::Duration {
    let secs = if interval_secs <= 0 {
        DEFAULT_INTERVAL_SECS
    } else {
        interval_secs as u64
    };
    std::time::Duration::from_secs(secs)
}
