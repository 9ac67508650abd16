//! Chats: server-side conversations that generations are attached to.
//!
//! A [`Chat`] owns the chat id and decides which memory each message is
//! generated against:
//! 1. the memory filled by [`Chat::data_loader`],
//! 2. a `memory_id` passed with the message,
//! 3. the chat's auto-memory, if enabled and no memory was passed.
//!
//! With auto-memory on, every completed exchange is written back to the
//! auto-memory as `Human: …` / `AI: …`.

use polyfact_core::stream::DEFAULT_STREAM_BUFFER;
use polyfact_core::{
    ChatMessage, GenerationOptions, GenerationResult, GenerationStream, Provider, Result,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::client::PolyfactClient;
use crate::loader::{DataSource, LoadProgress, load_into_memory};
use crate::memory::Memory;

/// Chat-wide settings. Per-message options override the generation fields.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Record every exchange into a dedicated memory and use it as context.
    pub auto_memory: bool,
    pub system_prompt: Option<String>,
    /// A stored system prompt; wins over `system_prompt`.
    pub system_prompt_id: Option<Uuid>,
    pub provider: Provider,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub stop: Vec<String>,
}

impl ChatOptions {
    pub fn with_auto_memory(mut self, enabled: bool) -> Self {
        self.auto_memory = enabled;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_system_prompt_id(mut self, id: Uuid) -> Self {
        self.system_prompt_id = Some(id);
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Default, Serialize)]
struct CreateChatBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<&'a str>,
}

impl<'a> CreateChatBody<'a> {
    fn new(system_prompt: Option<&'a str>, system_prompt_id: Option<Uuid>) -> Self {
        match system_prompt_id {
            Some(id) => Self {
                system_prompt_id: Some(id),
                system_prompt: None,
            },
            None => Self {
                system_prompt_id: None,
                system_prompt: system_prompt.filter(|p| !p.is_empty()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedChat {
    id: String,
}

/// Create a server-side chat and return its id.
pub async fn create_chat(
    client: &PolyfactClient,
    system_prompt: Option<&str>,
    system_prompt_id: Option<Uuid>,
) -> Result<String> {
    let body = CreateChatBody::new(system_prompt, system_prompt_id);
    let request = client.request(Method::POST, "/chats")?.json(&body);
    let created: CreatedChat = client.execute_json(request).await?;
    debug!(chat_id = %created.id, "Chat created");
    Ok(created.id)
}

/// A conversation with the generation service.
#[derive(Debug)]
pub struct Chat {
    client: PolyfactClient,
    id: String,
    options: ChatOptions,
    auto_memory: Option<Memory>,
    memory_id: Option<String>,
}

impl Chat {
    /// Create a new server-side chat (and its auto-memory, if enabled).
    pub async fn new(client: &PolyfactClient, options: ChatOptions) -> Result<Self> {
        let id = create_chat(
            client,
            options.system_prompt.as_deref(),
            options.system_prompt_id,
        )
        .await?;
        Self::resume(client, id, options).await
    }

    /// Continue an existing chat by id.
    pub async fn resume(
        client: &PolyfactClient,
        id: impl Into<String>,
        options: ChatOptions,
    ) -> Result<Self> {
        let auto_memory = if options.auto_memory {
            Some(Memory::create(client).await?)
        } else {
            None
        };

        Ok(Self {
            client: client.clone(),
            id: id.into(),
            options,
            auto_memory,
            memory_id: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the memory filled by [`Chat::data_loader`], if any.
    pub fn memory_id(&self) -> Option<&str> {
        self.memory_id.as_deref()
    }

    pub fn auto_memory(&self) -> Option<&Memory> {
        self.auto_memory.as_ref()
    }

    /// Merge per-message options with the chat's settings.
    fn generation_options(&self, mut options: GenerationOptions) -> GenerationOptions {
        if options.provider.is_none() {
            options.provider = Some(self.options.provider);
        }
        if options.model.is_none() {
            options.model = self.options.model.clone();
        }
        if options.temperature.is_none() {
            options.temperature = self.options.temperature;
        }
        if options.stop.is_empty() {
            options.stop = self.options.stop.clone();
        }
        if self.options.system_prompt_id.is_some() {
            options.system_prompt_id = self.options.system_prompt_id;
        }
        if let Some(loaded) = &self.memory_id {
            options.memory_id = Some(loaded.clone());
        } else if options.memory_id.is_none() {
            options.memory_id = self.auto_memory.as_ref().map(|m| m.id().to_string());
        }

        options.chat_id = Some(self.id.clone());
        options.web = false;
        options.infos = true;
        options
    }

    /// Send a message and return the reply text.
    pub async fn send_message(&self, message: &str, options: GenerationOptions) -> Result<String> {
        Ok(self.send_message_with_usage(message, options).await?.result)
    }

    /// Send a message and return the reply together with token usage.
    pub async fn send_message_with_usage(
        &self,
        message: &str,
        options: GenerationOptions,
    ) -> Result<GenerationResult> {
        let options = self.generation_options(options);
        let result = self.client.generate(message, &options).await?;

        if let Some(memory) = &self.auto_memory {
            remember_exchange(memory, message, &result.result).await;
        }

        Ok(result)
    }

    /// Send a message and receive the reply as it is generated.
    ///
    /// With auto-memory, the exchange is recorded once the stream has been
    /// consumed to its end; a stopped stream is not recorded.
    pub async fn send_message_stream(
        &self,
        message: &str,
        options: GenerationOptions,
    ) -> Result<GenerationStream> {
        let options = self.generation_options(options);
        let mut upstream = self.client.generate_stream(message, &options).await?;

        let Some(memory) = self.auto_memory.clone() else {
            return Ok(upstream);
        };

        let (tx, stream) = GenerationStream::channel(DEFAULT_STREAM_BUFFER);
        let message = message.to_string();

        tokio::spawn(async move {
            let mut answer = String::new();
            while let Some(chunk) = upstream.next_chunk().await {
                match chunk {
                    Ok(text) => {
                        answer.push_str(&text);
                        if !tx.send(text).await {
                            upstream.stop();
                            return;
                        }
                    }
                    Err(e) => {
                        tx.fail(e).await;
                        return;
                    }
                }
            }
            if tx.is_stopped() {
                debug!("Stopped stream not recorded in auto-memory");
                return;
            }
            // End the caller's stream before the memory round-trips.
            drop(tx);
            remember_exchange(&memory, &message, &answer).await;
        });

        Ok(stream)
    }

    /// The chat history, oldest first. Entries without the message shape
    /// are skipped.
    pub async fn get_messages(&self) -> Result<Vec<ChatMessage>> {
        let path = format!("/chat/{}/history", self.id);
        let request = self.client.request(Method::GET, &path)?;
        let values: Vec<serde_json::Value> = self.client.execute_json(request).await?;
        let total = values.len();
        let messages = ChatMessage::filter_valid(values);
        if messages.len() < total {
            debug!(
                chat_id = %self.id,
                dropped = total - messages.len(),
                "Skipped malformed history entries"
            );
        }
        Ok(messages)
    }

    /// Load `sources` into a new memory and use it for later messages.
    ///
    /// Failures are reported through `on_progress` as
    /// [`LoadProgress::LoadError`] and logged; they are not returned.
    pub async fn data_loader(
        &mut self,
        sources: &[DataSource],
        mut on_progress: impl FnMut(LoadProgress),
    ) {
        on_progress(LoadProgress::StartLoading);
        match load_into_memory(&self.client, sources).await {
            Ok(memory) => {
                on_progress(LoadProgress::GetMemoryId);
                self.memory_id = Some(memory.id().to_string());
                on_progress(LoadProgress::FullyLoaded);
            }
            Err(e) => {
                on_progress(LoadProgress::LoadError);
                error!(chat_id = %self.id, "Error loading data into memory: {e}");
            }
        }
    }
}

async fn remember_exchange(memory: &Memory, message: &str, answer: &str) {
    for entry in [format!("Human: {message}"), format!("AI: {answer}")] {
        if let Err(e) = memory.add(&entry).await {
            warn!(memory_id = %memory.id(), "Failed to record exchange in auto-memory: {e}");
            return;
        }
    }
}
