//! Memory resources: server-side embedding stores attached to generations.

use polyfact_core::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::PolyfactClient;

/// A server-side memory, identified by its id.
#[derive(Debug, Clone)]
pub struct Memory {
    client: PolyfactClient,
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMemory {
    id: String,
}

#[derive(Debug, Serialize)]
struct AddToMemory<'a> {
    id: &'a str,
    input: &'a str,
    max_token: u32,
}

#[derive(Debug, Deserialize)]
struct MemoryList {
    #[serde(default)]
    memories: Vec<MemorySummary>,
}

#[derive(Debug, Deserialize)]
struct MemorySummary {
    id: String,
}

impl Memory {
    /// Create a new, empty memory.
    pub async fn create(client: &PolyfactClient) -> Result<Self> {
        let request = client
            .request(Method::POST, "/memory")?
            .json(&serde_json::json!({}));
        let created: CreatedMemory = client.execute_json(request).await?;
        debug!(memory_id = %created.id, "Memory created");
        Ok(Self {
            client: client.clone(),
            id: created.id,
        })
    }

    /// Refer to an existing memory.
    pub fn from_id(client: &PolyfactClient, id: impl Into<String>) -> Self {
        Self {
            client: client.clone(),
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Embed `input` into this memory.
    pub async fn add(&self, input: &str) -> Result<()> {
        self.add_with_max_token(input, 0).await
    }

    /// Embed `input`, letting the service split it into pieces of at most
    /// `max_token` tokens (`0` = service default).
    pub async fn add_with_max_token(&self, input: &str, max_token: u32) -> Result<()> {
        let body = AddToMemory {
            id: &self.id,
            input,
            max_token,
        };
        let request = self.client.request(Method::PUT, "/memory")?.json(&body);
        self.client.execute(request).await?;
        debug!(memory_id = %self.id, bytes = input.len(), "Added to memory");
        Ok(())
    }

    /// Ids of all memories owned by the signed-in user.
    pub async fn list(client: &PolyfactClient) -> Result<Vec<String>> {
        let request = client.request(Method::GET, "/memories")?;
        let list: MemoryList = client.execute_json(request).await?;
        Ok(list.memories.into_iter().map(|m| m.id).collect())
    }
}
