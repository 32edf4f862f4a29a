// Access token persistence.
//
// Storage failures never propagate: a missing token only forces a new login,
// while a storage error surfacing here would take the client down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::Platform;

/// Fixed storage key the access token lives under.
pub const TOKEN_KEY: &str = "chanakya_access_token";

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persisted token, or `None` when absent or unreadable.
    async fn get_token(&self) -> Option<String>;

    async fn set_token(&self, token: &str);

    async fn remove_token(&self);

    /// Whether tokens survive a process restart.
    fn persists(&self) -> bool {
        true
    }
}

/// Native-target store: a single owner-readable file in the client config directory.
#[derive(Debug, Clone)]
pub struct SecureFileTokenStore {
    path: PathBuf,
}

impl SecureFileTokenStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, token.as_bytes()).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&staging, &self.path).await
    }
}

#[async_trait]
impl TokenStore for SecureFileTokenStore {
    async fn get_token(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let token = content.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("failed to read stored token from {}: {}", self.path.display(), e);
                None
            }
        }
    }

    async fn set_token(&self, token: &str) {
        if let Err(e) = self.write(token).await {
            tracing::warn!("failed to persist token to {}: {}", self.path.display(), e);
        }
    }

    async fn remove_token(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove stored token {}: {}", self.path.display(), e),
        }
    }
}

/// Web-target store. The token lives only in the session held in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralTokenStore;

#[async_trait]
impl TokenStore for EphemeralTokenStore {
    async fn get_token(&self) -> Option<String> {
        None
    }

    async fn set_token(&self, _token: &str) {}

    async fn remove_token(&self) {}

    fn persists(&self) -> bool {
        false
    }
}

/// Process-local store that does persist across sessions built on it.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    async fn set_token(&self, token: &str) {
        *self.token.lock().await = Some(token.to_string());
    }

    async fn remove_token(&self) {
        *self.token.lock().await = None;
    }
}

/// Pick the token store for the platform the client was composed for.
pub fn token_store_for(platform: Platform, dir: impl AsRef<Path>) -> Arc<dyn TokenStore> {
    match platform {
        Platform::Native => Arc::new(SecureFileTokenStore::new(dir)),
        Platform::Web => Arc::new(EphemeralTokenStore),
    }
}
