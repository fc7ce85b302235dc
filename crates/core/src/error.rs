//! Error types shared across the polling crates

use thiserror::Error;

/// Failure to decode a watermark from its textual form
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    #[error("invalid watermark '{input}': {reason}")]
    Parse { input: String, reason: String },
}

/// Failure raised by a listener while handling a change event
///
/// Listener failures are isolated by the registry: they are logged and
/// counted, never propagated to the poll cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
