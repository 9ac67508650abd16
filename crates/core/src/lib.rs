//! # Polyfact Core
//!
//! Domain types, traits, and error definitions for the Polyfact SDK.
//! This crate has **no HTTP dependencies**. It defines the shapes that
//! travel to and from the generation service, plus the seams the other
//! crates implement against.
//!
//! - [`Generator`] abstracts "run a generation", so the ReAct agent can be
//!   driven by the real HTTP client or by a scripted mock.
//! - [`SessionStore`] abstracts where the refresh token lives between runs.

pub mod error;
pub mod generation;
pub mod message;
pub mod session;
pub mod stream;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, ApiError, Error, ErrorData, Result, SessionError};
pub use generation::{GenerationOptions, GenerationResult, Generator, Provider, TokenUsage};
pub use message::ChatMessage;
pub use session::{
    FileSessionStore, InMemorySessionStore, REFRESH_TOKEN_KEY, Session, SessionStore,
};
pub use stream::{GenerationStream, StreamSender};
