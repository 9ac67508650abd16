//! Sign-in through the third-party identity provider.
//!
//! The flow has two legs:
//! 1. The identity provider hands back an access token (after an OAuth
//!    redirect, or by refreshing a stored refresh token).
//! 2. That token is exchanged for a Polyfact access token scoped to a
//!    project, which is installed into the shared [`Credentials`].
//!
//! Session resolution is serialized by a mutex so that two concurrent
//! refreshes never race on the stored refresh token.

use std::sync::Arc;

use polyfact_config::{ClientConfig, IdentityConfig};
use polyfact_core::{
    Error, FileSessionStore, REFRESH_TOKEN_KEY, Result, Session, SessionError, SessionStore,
};
use reqwest::Url;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{PolyfactClient, ensure_success};

/// OAuth providers supported for browser sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Github,
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Google => "google",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "google" => Ok(Self::Google),
            other => Err(Error::Config {
                message: format!("unknown OAuth provider '{other}' (expected github or google)"),
            }),
        }
    }
}

/// What to sign in with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginInput {
    /// Browser OAuth through the identity provider.
    Provider(OAuthProvider),
    /// An ID token already issued by Firebase.
    Firebase { token: String },
}

impl From<OAuthProvider> for LoginInput {
    fn from(provider: OAuthProvider) -> Self {
        Self::Provider(provider)
    }
}

/// Result of [`AuthClient::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials are installed; the client is ready.
    SignedIn,
    /// Open `url` in a browser. The identity provider redirects back with
    /// tokens in the URL fragment, which [`AuthClient::init`] consumes.
    Redirect { url: String },
}

/// Which kind of third-party token is being exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Token,
    Firebase,
}

impl TokenKind {
    fn path_segment(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Firebase => "firebase",
        }
    }
}

/// Connection details for the identity provider.
#[derive(Clone)]
pub struct IdentityProvider {
    url: String,
    anon_key: String,
}

impl IdentityProvider {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    /// `None` when the configuration leaves the provider out.
    pub fn from_config(config: &IdentityConfig) -> Option<Self> {
        match (&config.url, &config.anon_key) {
            (Some(url), Some(key)) => Some(Self::new(url.clone(), key.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Tokens carried in the fragment of an OAuth callback URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Read `access_token` and `refresh_token` from a callback URL fragment
/// (`…#access_token=…&refresh_token=…`).
pub fn parse_callback(url: &str) -> std::result::Result<CallbackTokens, SessionError> {
    let parsed = Url::parse(url).map_err(|e| SessionError::InvalidCallback(e.to_string()))?;
    let Some(fragment) = parsed.fragment() else {
        return Ok(CallbackTokens::default());
    };

    // Decode the fragment with the query-string parser.
    let mut carrier = Url::parse("http://callback.invalid/")
        .map_err(|e| SessionError::InvalidCallback(e.to_string()))?;
    carrier.set_query(Some(fragment.trim_start_matches('#')));

    let mut tokens = CallbackTokens::default();
    for (key, value) in carrier.query_pairs() {
        match key.as_ref() {
            "access_token" if !value.is_empty() => tokens.access_token = Some(value.into_owned()),
            "refresh_token" if !value.is_empty() => tokens.refresh_token = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(tokens)
}

#[derive(Debug, Deserialize)]
struct RefreshedSession {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Sign-in and session management for a project.
pub struct AuthClient {
    client: PolyfactClient,
    project_id: String,
    identity: Option<IdentityProvider>,
    store: Arc<dyn SessionStore>,
    session_lock: Mutex<()>,
}

impl AuthClient {
    pub fn new(
        client: PolyfactClient,
        project_id: impl Into<String>,
        identity: Option<IdentityProvider>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            identity,
            store,
            session_lock: Mutex::new(()),
        }
    }

    /// Build from configuration, persisting the session in the configured
    /// session file. Requires `project_id`.
    pub fn from_config(client: PolyfactClient, config: &ClientConfig) -> Result<Self> {
        let project_id = config.project_id.clone().ok_or_else(|| Error::Config {
            message: "project_id is required for sign-in (set POLYFACT_PROJECT_ID)".into(),
        })?;
        Ok(Self::new(
            client,
            project_id,
            IdentityProvider::from_config(&config.identity),
            Arc::new(FileSessionStore::new(config.session_path())),
        ))
    }

    pub fn client(&self) -> &PolyfactClient {
        &self.client
    }

    fn identity(&self) -> Result<&IdentityProvider> {
        self.identity.as_ref().ok_or_else(|| {
            SessionError::IdentityProviderMissing("set [identity] url and anon_key".into()).into()
        })
    }

    /// Resolve the identity-provider session.
    ///
    /// Tokens in `callback_url` take precedence; a refresh token found there
    /// is persisted. Otherwise the stored refresh token is used. Without an
    /// access token, the refresh token is traded for a new pair; if that
    /// fails the stored token is discarded and an empty session returned.
    pub async fn get_session(&self, callback_url: Option<&str>) -> Result<Session> {
        let _guard = self.session_lock.lock().await;

        let callback = match callback_url {
            Some(url) => parse_callback(url)?,
            None => CallbackTokens::default(),
        };
        let token = callback.access_token;

        let refresh_token = match callback.refresh_token {
            Some(refresh_token) => {
                self.store.set(REFRESH_TOKEN_KEY, &refresh_token).await?;
                Some(refresh_token)
            }
            None => self.store.get(REFRESH_TOKEN_KEY).await?,
        };

        let Some(refresh_token) = refresh_token else {
            debug!("No refresh token available");
            return Ok(Session::default());
        };

        if token.is_some() {
            return Ok(Session { token });
        }

        match self.refresh(&refresh_token).await? {
            Some(refreshed) => {
                if let Some(next) = &refreshed.refresh_token {
                    self.store.set(REFRESH_TOKEN_KEY, next).await?;
                }
                Ok(Session {
                    token: refreshed.access_token,
                })
            }
            None => {
                self.store.remove(REFRESH_TOKEN_KEY).await?;
                Ok(Session::default())
            }
        }
    }

    /// Trade a refresh token for a new session. `None` when the identity
    /// provider refuses or is unreachable.
    async fn refresh(&self, refresh_token: &str) -> Result<Option<RefreshedSession>> {
        let identity = self.identity()?;
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", identity.url);

        let response = self
            .client
            .http()
            .post(&url)
            .header("apikey", &identity.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", identity.anon_key))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = r.status().as_u16(), "Session refresh rejected");
                return Ok(None);
            }
            Err(e) => {
                warn!("Session refresh failed: {e}");
                return Ok(None);
            }
        };

        match response.json::<RefreshedSession>().await {
            Ok(session) if session.access_token.as_deref().is_some_and(|t| !t.is_empty()) => {
                debug!("Session refreshed");
                Ok(Some(session))
            }
            Ok(_) => {
                warn!("Session refresh returned no access token");
                Ok(None)
            }
            Err(e) => {
                warn!("Session refresh returned an unreadable body: {e}");
                Ok(None)
            }
        }
    }

    /// The identity provider URL that starts a browser sign-in with
    /// `provider`, returning to `redirect_to`.
    pub fn oauth_redirect(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String> {
        let identity = self.identity()?;
        let url = Url::parse_with_params(
            &format!("{}/auth/v1/authorize", identity.url),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map_err(|e| Error::Config {
            message: format!("invalid identity provider URL: {e}"),
        })?;
        Ok(url.to_string())
    }

    /// Exchange a third-party token for a Polyfact access token and install
    /// it into the client's credentials.
    pub async fn sign_in_with_oauth_token(&self, token: &str, kind: TokenKind) -> Result<()> {
        let path = format!(
            "/project/{}/auth/{}",
            self.project_id,
            kind.path_segment()
        );
        let response = self
            .client
            .http()
            .get(self.client.url(&path))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let body = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        // The token comes back either as a JSON string or as plain text.
        let access_token = serde_json::from_str::<String>(&body)
            .unwrap_or_else(|_| body.trim().to_string());
        if access_token.is_empty() {
            return Err(Error::NotAuthenticated(
                "token exchange returned an empty token".into(),
            ));
        }

        self.client.credentials().set(access_token);
        info!(project_id = %self.project_id, kind = kind.path_segment(), "Signed in");
        Ok(())
    }

    /// Sign in. Firebase tokens are exchanged directly; OAuth providers
    /// return the URL the user must visit.
    pub async fn login(
        &self,
        input: impl Into<LoginInput>,
        redirect_to: &str,
    ) -> Result<LoginOutcome> {
        match input.into() {
            LoginInput::Firebase { token } => {
                self.sign_in_with_oauth_token(&token, TokenKind::Firebase)
                    .await?;
                Ok(LoginOutcome::SignedIn)
            }
            LoginInput::Provider(provider) => {
                let url = self.oauth_redirect(provider, redirect_to)?;
                info!(provider = provider.as_str(), "Browser sign-in required");
                Ok(LoginOutcome::Redirect { url })
            }
        }
    }

    /// Forget the stored session and the installed access token.
    pub async fn logout(&self) -> Result<()> {
        self.store.remove(REFRESH_TOKEN_KEY).await?;
        self.client.credentials().clear();
        info!("Signed out");
        Ok(())
    }

    /// Restore a session (from `callback_url` or storage) and sign in with
    /// it. Returns whether the client is now authenticated.
    pub async fn init(&self, callback_url: Option<&str>) -> Result<bool> {
        let session = self.get_session(callback_url).await?;
        match session.token {
            Some(token) => {
                self.sign_in_with_oauth_token(&token, TokenKind::Token)
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("project_id", &self.project_id)
            .field("identity", &self.identity)
            .finish()
    }
}
