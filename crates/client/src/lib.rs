//! HTTP client for the Polyfact generation service.
//!
//! Everything here is a thin consumption layer over the remote API:
//! - [`PolyfactClient`]: generation (complete and streamed), implements `Generator`
//! - [`Chat`]: server-side chat lifecycle with optional auto-memory
//! - [`Memory`]: embedding/retrieval resources and data loading
//! - [`AuthClient`]: identity-provider sessions and token exchange

pub mod auth;
pub mod chat;
pub mod client;
pub mod credentials;
pub mod generate;
pub mod loader;
pub mod memory;

pub use auth::{AuthClient, IdentityProvider, LoginInput, LoginOutcome, OAuthProvider, TokenKind};
pub use chat::{Chat, ChatOptions, create_chat};
pub use client::PolyfactClient;
pub use credentials::Credentials;
pub use generate::END_OF_STREAM;
pub use loader::{DataSource, LoadProgress};
pub use memory::Memory;
