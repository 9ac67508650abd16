//! The Polyfact HTTP client and its request plumbing.

use std::time::Duration;

use polyfact_config::ClientConfig;
use polyfact_core::{ApiError, Error, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::credentials::Credentials;

/// Header the service reads the access token from.
pub const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// Timeout for complete (non-streaming) requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A client for the Polyfact generation service.
///
/// Cheap to clone: clones share the connection pool and [`Credentials`].
#[derive(Debug, Clone)]
pub struct PolyfactClient {
    http: reqwest::Client,
    credentials: Credentials,
}

impl PolyfactClient {
    /// Create a client around existing credentials.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http, credentials })
    }

    /// Create a client from loaded configuration.
    ///
    /// A configured token is installed right away; otherwise the client stays
    /// unauthenticated until an [`crate::AuthClient`] signs in.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let credentials = Credentials::new(config.endpoint());
        if let Some(token) = &config.token {
            credentials.set(token.clone());
        }
        Self::new(credentials)
    }

    /// Convenience constructor for a known endpoint and token.
    pub fn with_token(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::new(Credentials::with_token(endpoint, token))
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &str {
        self.credentials.endpoint()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.credentials.endpoint(), path)
    }

    /// An authenticated request with the default timeout.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.stream_request(method, path)?.timeout(REQUEST_TIMEOUT))
    }

    /// An authenticated request without an overall timeout, for bodies that
    /// are consumed incrementally.
    pub(crate) fn stream_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.credentials.token()?;
        Ok(self
            .http
            .request(method, self.url(path))
            .header(ACCESS_TOKEN_HEADER, token))
    }

    /// Send a request, turning transport failures into `Network` and
    /// non-success statuses into `Api` errors.
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        ensure_success(response).await
    }

    /// Send a request and decode its JSON body.
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pass successful responses through; wrap anything else in an [`ApiError`]
/// carrying the service's error payload.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = ApiError::from_response(status.as_u16(), &body);
    warn!(status = status.as_u16(), code = %error.code, "Polyfact API returned error");
    Err(Error::Api(error))
}
