//! Generation types and the `Generator` trait.
//!
//! A Generator knows how to send a task to the generation service and get
//! the result back, either complete or as a stream of text chunks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::stream::GenerationStream;

/// The model provider the service should route a generation to.
///
/// `Default` serializes as the empty string and lets the service choose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Cohere,
    Llama,
    #[default]
    #[serde(rename = "")]
    Default,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Cohere => "cohere",
            Self::Llama => "llama",
            Self::Default => "",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "cohere" => Ok(Self::Cohere),
            "llama" => Ok(Self::Llama),
            "" | "default" => Ok(Self::Default),
            other => Err(Error::Config {
                message: format!("unknown provider '{other}' (expected openai, cohere or llama)"),
            }),
        }
    }
}

/// Options for a single generation request.
///
/// Unset fields are left out of the request body so the service applies
/// its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Let the service ground the answer with a web search.
    #[serde(default)]
    pub web: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_id: Option<Uuid>,

    /// Ask the service to report token usage alongside the result.
    #[serde(default)]
    pub infos: bool,
}

impl GenerationOptions {
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_web(mut self, web: bool) -> Self {
        self.web = web;
        self
    }

    pub fn with_memory_id(mut self, memory_id: impl Into<String>) -> Self {
        self.memory_id = Some(memory_id.into());
        self
    }

    pub fn with_infos(mut self, infos: bool) -> Self {
        self.infos = infos;
        self
    }
}

/// Token usage reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input.saturating_add(self.output)
    }
}

/// A complete (non-streaming) generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub result: String,

    #[serde(default)]
    pub token_usage: TokenUsage,
}

/// The core Generator trait.
///
/// The HTTP client implements this against the real service; tests and the
/// agent loop only ever see the trait.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run a generation and wait for the complete result.
    async fn generate(&self, task: &str, options: &GenerationOptions) -> Result<GenerationResult>;

    /// Run a generation and receive its text as it is produced.
    ///
    /// Default implementation calls `generate()` and yields the result as a
    /// single chunk.
    async fn generate_stream(
        &self,
        task: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationStream> {
        let result = self.generate(task, options).await?;
        Ok(GenerationStream::from_text(result.result))
    }
}
