//! CRM bearer token persistence and the single in-process holder.
//!
//! Exactly one token exists per process. [`TokenHolder`] owns it, loads it
//! lazily from a [`TokenStore`] on first use, and mirrors every change back to
//! the store. An empty persisted value means "cleared".

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::RelayError;

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns `None` when no token was ever persisted or the last save cleared it.
    async fn load(&self) -> Result<Option<String>, RelayError>;
    /// Overwrites durable storage. An empty value clears it.
    async fn save(&self, token: &str) -> Result<(), RelayError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedToken {
    access_token: String,
    saved_at: DateTime<Utc>,
}

/// File-backed store. The whole file is rewritten on every save.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, RelayError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(RelayError::Storage(format!(
                    "could not read `{}`: {error}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str::<PersistedToken>(&raw) {
            Ok(persisted) if persisted.access_token.is_empty() => Ok(None),
            Ok(persisted) => Ok(Some(persisted.access_token)),
            Err(error) => {
                warn!(
                    event_name = "crm.token.corrupt",
                    path = %self.path.display(),
                    error = %error,
                    "ignoring unreadable token file"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, token: &str) -> Result<(), RelayError> {
        let persisted = PersistedToken { access_token: token.to_string(), saved_at: Utc::now() };
        let body = serde_json::to_string_pretty(&persisted)
            .map_err(|error| RelayError::Storage(error.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                RelayError::Storage(format!("could not create `{}`: {error}", parent.display()))
            })?;
        }
        tokio::fs::write(&self.path, body).await.map_err(|error| {
            RelayError::Storage(format!("could not write `{}`: {error}", self.path.display()))
        })
    }
}

#[derive(Debug, Default)]
struct TokenSlot {
    loaded: bool,
    token: Option<String>,
}

/// Single owner of the CRM token. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenHolder {
    store: Arc<dyn TokenStore>,
    slot: Arc<Mutex<TokenSlot>>,
}

impl TokenHolder {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store, slot: Arc::new(Mutex::new(TokenSlot::default())) }
    }

    /// Current token, loading the persisted one on first call.
    pub async fn get(&self) -> Option<String> {
        let mut slot = self.slot.lock().await;
        if !slot.loaded {
            slot.token = match self.store.load().await {
                Ok(token) => token,
                Err(error) => {
                    warn!(
                        event_name = "crm.token.load_failed",
                        error = %error,
                        "could not load persisted crm token"
                    );
                    None
                }
            };
            slot.loaded = true;
            if slot.token.is_some() {
                info!(event_name = "crm.token.loaded", "persisted crm token loaded");
            }
        }
        slot.token.clone()
    }

    /// Stores a freshly granted token in memory and durable storage.
    pub async fn set(&self, token: impl Into<String>) -> Result<(), RelayError> {
        let token = token.into();
        let mut slot = self.slot.lock().await;
        slot.token = Some(token.clone());
        slot.loaded = true;
        self.store.save(&token).await
    }

    /// Clears the token unconditionally.
    pub async fn clear(&self) -> Result<(), RelayError> {
        let mut slot = self.slot.lock().await;
        slot.token = None;
        slot.loaded = true;
        self.store.save("").await
    }

    /// Clears the token only if it is still `rejected`. Returns whether it cleared.
    ///
    /// A newer token granted while the rejected request was in flight survives.
    pub async fn invalidate(&self, rejected: &str) -> Result<bool, RelayError> {
        let mut slot = self.slot.lock().await;
        if slot.token.as_deref() != Some(rejected) {
            return Ok(false);
        }
        slot.token = None;
        slot.loaded = true;
        self.store.save("").await?;
        Ok(true)
    }
}
