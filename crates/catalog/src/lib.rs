//! Remote catalog interface
//!
//! The poller only ever talks to a catalog through [`RemoteCatalog`]. This
//! crate provides the trait plus two in-process implementations:
//! - [`MemoryCatalog`]: scripted, fully in-memory (tests, embedding)
//! - [`FeedCatalog`]: a JSON feed file re-read on every fetch

pub mod error;
pub mod feed;
pub mod memory;

pub use error::CatalogError;
pub use feed::FeedCatalog;
pub use memory::MemoryCatalog;

use async_trait::async_trait;
use poll_core::{Item, ItemId};
use std::fmt;
use std::path::Path;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Opaque session token issued by a catalog
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank tokens are treated as absent
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Operations a remote catalog exposes
///
/// `since` is always a watermark in its canonical encoding
/// (see [`poll_core::watermark::format_timestamp`]).
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Items added on or after `since`
    async fn fetch_since(&self, since: &str, credential: &Credential) -> Result<Vec<Item>>;

    /// Every item in the catalog
    async fn fetch_all(&self, credential: &Credential) -> Result<Vec<Item>>;

    /// Exchange account credentials for a session token
    async fn login(&self, _email: &str, _password: &str) -> Result<Credential> {
        Err(CatalogError::Unsupported("login"))
    }

    /// Store the content of item `id` at `destination`
    async fn download(&self, _id: ItemId, _destination: &Path, _credential: &Credential) -> Result<()> {
        Err(CatalogError::Unsupported("download"))
    }

    /// Publish `file` to the catalog, returning the catalog's response body
    async fn upload(&self, _file: &Path, _origin_url: &str, _credential: &Credential) -> Result<String> {
        Err(CatalogError::Unsupported("upload"))
    }

    /// Display name of a catalog user
    async fn resolve_nickname(&self, _user_id: i64, _credential: &Credential) -> Result<String> {
        Err(CatalogError::Unsupported("resolve_nickname"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = Credential::new("secret-token");
        assert!(!format!("{:?}", cred).contains("secret"));
    }

    #[test]
    fn test_blank_credential() {
        assert!(Credential::new("  ").is_blank());
        assert!(!Credential::new("t").is_blank());
    }
}
