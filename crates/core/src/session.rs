//! Session persistence.
//!
//! The auth flow keeps exactly one durable value between runs: the identity
//! provider's refresh token, stored under [`REFRESH_TOKEN_KEY`]. A
//! [`SessionStore`] is the key/value slot that holds it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SessionError;

/// Key under which the refresh token is stored.
pub const REFRESH_TOKEN_KEY: &str = "polyfact_refresh_token";

/// The outcome of resolving the current session.
///
/// An empty session (no token) means the user is not signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
}

impl Session {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }
}

/// A small string key/value store for session data.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    async fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self
            .values
            .lock()
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values
            .lock()
            .map_err(|e| SessionError::Storage(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.values
            .lock()
            .map_err(|e| SessionError::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}

/// JSON-file store: a single object of string values, rewritten on every
/// mutation.
///
/// Default location: `~/.polyfact/session.json`
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, SessionError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(SessionError::Storage(e.to_string())),
        };

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupted session file");
                Ok(HashMap::new())
            }
        }
    }

    async fn flush(&self, values: &HashMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SessionError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        debug!(path = %self.path.display(), keys = values.len(), "Session file written");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        self.flush(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(key).is_some() {
            self.flush(&values).await?;
        }
        Ok(())
    }
}
