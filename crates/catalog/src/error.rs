//! Catalog error taxonomy

use poll_core::ItemId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The credential is missing, invalid or expired
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The catalog could not be reached or answered garbage
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("item {0} not found")]
    NotFound(ItemId),

    #[error("user {0} not found")]
    UnknownUser(i64),

    #[error("operation not supported by this catalog: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn is_auth(&self) -> bool {
        matches!(self, CatalogError::Auth(_))
    }
}
