//! Durable token storage.
//!
//! Exactly two values survive a restart: the access token and the refresh
//! token, under the fixed keys `access_token` and `refresh_token`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;
use crate::models::TokenPair;

/// Raw persisted values. Either key may be missing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(rename = "access_token", default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(rename = "refresh_token", default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl StoredTokens {
    /// Both tokens, or `None` if either is missing or empty.
    pub fn into_pair(self) -> Option<TokenPair> {
        match (self.access, self.refresh) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(TokenPair { access, refresh })
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

impl From<&TokenPair> for StoredTokens {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access: Some(pair.access.clone()),
            refresh: Some(pair.refresh.clone()),
        }
    }
}

/// Durable storage for the token pair.
///
/// Written only by login, refresh success and logout; read only at bootstrap.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn load(&self) -> Result<StoredTokens, StorageError>;

    async fn save(&self, tokens: &TokenPair) -> Result<(), StorageError>;

    /// Remove both tokens. Clearing empty storage is not an error.
    async fn clear(&self) -> Result<(), StorageError>;
}

// =============================================================================
// File-backed storage
// =============================================================================

/// JSON file holding `{"access_token": ..., "refresh_token": ...}`.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> Result<StoredTokens, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file");
                return Ok(StoredTokens::default());
            }
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(StoredTokens::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(&StoredTokens::from(tokens))?;

        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// In-memory storage
// =============================================================================

/// Process-local storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    tokens: Mutex<StoredTokens>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with raw values (either may be absent).
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    /// Current stored values.
    pub fn snapshot(&self) -> StoredTokens {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn replace(&self, value: StoredTokens) {
        *self
            .tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> Result<StoredTokens, StorageError> {
        Ok(self.snapshot())
    }

    async fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        self.replace(StoredTokens::from(tokens));
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.replace(StoredTokens::default());
        Ok(())
    }
}
