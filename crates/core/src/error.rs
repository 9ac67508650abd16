//! Error types for the Polyfact SDK.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Failures reported by the remote service are wrapped into [`ApiError`],
//! which carries the service's `{ code, message }` payload. Everything else
//! propagates as-is through the other variants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all Polyfact operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Remote service errors ---
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(String),

    // --- Auth ---
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Agent ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// The error payload returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// An error response from the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message} (status: {status})")]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Fallback code used when the body is not a `{ code, message }` payload.
    pub const UNKNOWN_CODE: &'static str = "unknown_error";

    /// Build an error from a non-success HTTP status and its raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorData>(body) {
            Ok(data) => Self {
                status,
                code: data.code,
                message: data.message,
            },
            Err(_) => Self {
                status,
                code: Self::UNKNOWN_CODE.into(),
                message: body.trim().to_string(),
            },
        }
    }

    /// The service payload this error was built from.
    pub fn data(&self) -> ErrorData {
        ErrorData {
            code: self.code.clone(),
            message: self.message.clone(),
        }
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("Unknown line type: {kind}, arg: {arg}")]
    UnknownLineType { kind: String, arg: String },

    #[error("Expected action")]
    ExpectedAction,

    #[error("Unknown action type: {0}")]
    UnknownActionType(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage failed: {0}")]
    Storage(String),

    #[error("Identity provider not configured: {0}")]
    IdentityProviderMissing(String),

    #[error("Invalid callback URL: {0}")]
    InvalidCallback(String),
}
