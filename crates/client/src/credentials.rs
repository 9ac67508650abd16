//! Shared client credentials.
//!
//! The endpoint is fixed at construction; the access token can be set after
//! sign-in and cleared on sign-out. Clones share the same token slot, so a
//! sign-in through [`crate::AuthClient`] is visible to every chat and memory
//! built from the same client.

use std::sync::{Arc, RwLock};

use polyfact_core::{Error, Result};

#[derive(Clone)]
pub struct Credentials {
    endpoint: Arc<str>,
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: Arc::from(endpoint.trim_end_matches('/')),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_token(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        let credentials = Self::new(endpoint);
        credentials.set(token);
        credentials
    }

    /// Base URL without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
    }

    /// Forget the token. Later requests fail with `NotAuthenticated`.
    pub fn clear(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn token(&self) -> Result<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                Error::NotAuthenticated(
                    "no access token; sign in or set POLYFACT_TOKEN".into(),
                )
            })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field(
                "token",
                &if self.is_authenticated() { "[REDACTED]" } else { "None" },
            )
            .finish()
    }
}
