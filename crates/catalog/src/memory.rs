//! In-memory catalog
//!
//! Holds items, accounts and nicknames in process. Responses to
//! `fetch_since` can be scripted ahead of time, which makes it possible to
//! replay the same batch twice or inject failures between cycles.

use crate::{CatalogError, Credential, RemoteCatalog, Result};
use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use poll_core::watermark::parse_timestamp;
use poll_core::{Item, ItemId};
use std::collections::VecDeque;
use std::path::Path;

#[derive(Default)]
struct State {
    items: Vec<Item>,
    /// Queued `fetch_since` responses, consumed before `items` is consulted
    scripted: VecDeque<Result<Vec<Item>>>,
    /// email -> password
    accounts: AHashMap<String, String>,
    tokens: AHashSet<String>,
    nicknames: AHashMap<i64, String>,
    /// Watermarks received by `fetch_since`, in call order
    since_log: Vec<String>,
    issued: u64,
}

#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as a valid credential
    pub fn with_token(self, token: &str) -> Self {
        self.state.lock().tokens.insert(token.to_string());
        self
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.state
            .lock()
            .accounts
            .insert(email.to_string(), password.to_string());
        self
    }

    pub fn with_nickname(self, user_id: i64, nickname: &str) -> Self {
        self.state.lock().nicknames.insert(user_id, nickname.to_string());
        self
    }

    /// Invalidate `token`, as if the session had expired
    pub fn revoke_token(&self, token: &str) {
        self.state.lock().tokens.remove(token);
    }

    /// Register an item in the catalog
    pub fn insert(&self, item: Item) {
        self.state.lock().items.push(item);
    }

    /// Queue a successful `fetch_since` response
    pub fn respond_with(&self, items: Vec<Item>) {
        self.state.lock().scripted.push_back(Ok(items));
    }

    /// Queue a failing `fetch_since` response
    pub fn fail_with(&self, err: CatalogError) {
        self.state.lock().scripted.push_back(Err(err));
    }

    /// Watermarks passed to `fetch_since` so far
    pub fn since_log(&self) -> Vec<String> {
        self.state.lock().since_log.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().since_log.len()
    }

    fn authorize(state: &State, credential: &Credential) -> Result<()> {
        if credential.is_blank() || !state.tokens.contains(credential.as_str()) {
            return Err(CatalogError::Auth("invalid or expired token".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCatalog for MemoryCatalog {
    async fn fetch_since(&self, since: &str, credential: &Credential) -> Result<Vec<Item>> {
        let mut state = self.state.lock();
        Self::authorize(&state, credential)?;
        state.since_log.push(since.to_string());

        if let Some(response) = state.scripted.pop_front() {
            return response;
        }

        let since = parse_timestamp(since).map_err(|e| CatalogError::Transport(e.to_string()))?;
        Ok(state
            .items
            .iter()
            .filter(|item| item.added_at.map_or(true, |added| added >= since))
            .cloned()
            .collect())
    }

    async fn fetch_all(&self, credential: &Credential) -> Result<Vec<Item>> {
        let state = self.state.lock();
        Self::authorize(&state, credential)?;
        Ok(state.items.clone())
    }

    async fn login(&self, email: &str, password: &str) -> Result<Credential> {
        let mut state = self.state.lock();
        match state.accounts.get(email) {
            Some(expected) if expected == password => {
                state.issued += 1;
                let token = format!("session-{}", state.issued);
                state.tokens.insert(token.clone());
                Ok(Credential::new(token))
            }
            _ => Err(CatalogError::Auth(format!("bad credentials for {}", email))),
        }
    }

    async fn download(&self, id: ItemId, destination: &Path, credential: &Credential) -> Result<()> {
        let body = {
            let state = self.state.lock();
            Self::authorize(&state, credential)?;
            let item = state
                .items
                .iter()
                .find(|item| item.id == id)
                .ok_or(CatalogError::NotFound(id))?;
            serde_json::to_vec_pretty(&item.metadata)
                .map_err(|e| CatalogError::Transport(e.to_string()))?
        };

        tokio::fs::write(destination, body).await?;
        Ok(())
    }

    async fn upload(&self, file: &Path, origin_url: &str, credential: &Credential) -> Result<String> {
        Self::authorize(&self.state.lock(), credential)?;

        let size = tokio::fs::metadata(file).await?.len();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut state = self.state.lock();
        let id = state.items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
        let item = Item::new(id)
            .with_added_at(Utc::now())
            .with_metadata(serde_json::json!({
                "name": name,
                "origin_url": origin_url,
                "size": size,
            }));
        let response = serde_json::to_string(&item).map_err(|e| CatalogError::Transport(e.to_string()))?;
        state.items.push(item);
        Ok(response)
    }

    async fn resolve_nickname(&self, user_id: i64, credential: &Credential) -> Result<String> {
        let state = self.state.lock();
        Self::authorize(&state, credential)?;
        state
            .nicknames
            .get(&user_id)
            .cloned()
            .ok_or(CatalogError::UnknownUser(user_id))
    }
}
