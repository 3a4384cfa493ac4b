// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use atp_error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

/// Tokens are refreshed this many seconds before they expire.
pub const REFRESH_WINDOW_SECS: i64 = 60;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// TokenSet
// ---------------------------------------------------------------------------

/// Tokens issued by the authorization server, plus the derived absolute
/// expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token.
    pub access_token: String,
    /// The refresh token, when one was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token type, `"DPoP"` for this flow.
    pub token_type: String,
    /// Relative lifetime in seconds, as issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// The authenticated subject (a DID).
    pub sub: String,
    /// Absolute expiry in Unix seconds; derived from `expires_in` on store
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

// ---------------------------------------------------------------------------
// SecureStorage
// ---------------------------------------------------------------------------

/// Persistent storage capability for token blobs.
///
/// Reads and writes are suspension points; implementations may hit a
/// keychain, a file, or nothing at all.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Read the blob stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Write `value` under `key`, replacing any previous blob.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    /// Delete the blob under `key`. Deleting a missing key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory [`SecureStorage`] for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySecureStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStorage for MemorySecureStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().expect("storage lock poisoned").get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.blobs
            .lock()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs.lock().expect("storage lock poisoned").remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TokenManager
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TokenCache {
    loaded: bool,
    tokens: Option<TokenSet>,
}

/// Owns the current [`TokenSet`] and its optional persistent backing.
///
/// A cold manager populates its memory from storage on the first read.
pub struct TokenManager {
    cache: RwLock<TokenCache>,
    storage: Option<Arc<dyn SecureStorage>>,
    storage_key: String,
}

impl TokenManager {
    /// A manager with optional persistent storage scoped by `storage_key`.
    pub fn new(storage: Option<Arc<dyn SecureStorage>>, storage_key: impl Into<String>) -> Self {
        Self {
            cache: RwLock::new(TokenCache::default()),
            storage,
            storage_key: storage_key.into(),
        }
    }

    /// Store tokens, deriving `expires_at = now + expires_in` when the
    /// absolute form is absent. Persists to storage when configured.
    pub async fn store_tokens(&self, mut tokens: TokenSet) -> Result<()> {
        if tokens.expires_at.is_none() {
            if let Some(expires_in) = tokens.expires_in {
                tokens.expires_at = Some(now_secs() + expires_in);
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(ref storage) = self.storage {
            let blob =
                serde_json::to_vec(&tokens).map_err(|e| Error::Encoding(e.to_string()))?;
            storage.set(&self.storage_key, blob).await?;
        }
        cache.tokens = Some(tokens);
        cache.loaded = true;
        debug!("tokens stored");
        Ok(())
    }

    /// The current tokens, reading from storage on the first call.
    pub async fn get_tokens(&self) -> Result<Option<TokenSet>> {
        {
            let cache = self.cache.read().await;
            if cache.loaded {
                return Ok(cache.tokens.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // Another caller may have loaded while we waited for the lock.
        if cache.loaded {
            return Ok(cache.tokens.clone());
        }
        if let Some(ref storage) = self.storage {
            if let Some(blob) = storage.get(&self.storage_key).await? {
                let tokens: TokenSet = serde_json::from_slice(&blob)
                    .map_err(|e| Error::Decoding(format!("stored token set: {e}")))?;
                cache.tokens = Some(tokens);
            }
        }
        cache.loaded = true;
        Ok(cache.tokens.clone())
    }

    /// Drop tokens from memory and storage. A no-op when nothing is stored.
    pub async fn clear_tokens(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        if let Some(ref storage) = self.storage {
            storage.delete(&self.storage_key).await?;
        }
        cache.tokens = None;
        cache.loaded = true;
        Ok(())
    }

    /// True when no usable tokens exist or expiry is within
    /// [`REFRESH_WINDOW_SECS`]. The boundary instant reports `true`.
    pub async fn needs_refresh(&self) -> Result<bool> {
        Ok(match self.get_tokens().await? {
            None => true,
            Some(tokens) => match tokens.expires_at {
                None => true,
                Some(expires_at) => now_secs() + REFRESH_WINDOW_SECS >= expires_at,
            },
        })
    }

    /// True when no tokens, no expiry, or the expiry has passed.
    pub async fn is_expired(&self) -> Result<bool> {
        Ok(match self.get_tokens().await? {
            None => true,
            Some(tokens) => match tokens.expires_at {
                None => true,
                Some(expires_at) => now_secs() >= expires_at,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
