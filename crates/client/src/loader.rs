//! Loading documents into a fresh memory.

use std::path::PathBuf;

use polyfact_core::Result;
use tracing::{debug, info};

use crate::client::PolyfactClient;
use crate::memory::Memory;

/// Upper bound on the size of a single piece sent to the memory endpoint.
pub const DEFAULT_CHUNK_CHARS: usize = 2000;

/// Something that can be loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Inline text.
    Text(String),
    /// A UTF-8 text file on disk.
    File(PathBuf),
}

impl DataSource {
    pub async fn read(&self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::File(path) => Ok(tokio::fs::read_to_string(path).await?),
        }
    }
}

/// Progress reported while loading data into a chat's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
    StartLoading,
    GetMemoryId,
    FullyLoaded,
    LoadError,
}

impl LoadProgress {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartLoading => "START_LOADING",
            Self::GetMemoryId => "GET_MEMORY_ID",
            Self::FullyLoaded => "FULLY_LOADED",
            Self::LoadError => "LOAD_ERROR",
        }
    }
}

impl std::fmt::Display for LoadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split text on blank lines and pack paragraphs into pieces of at most
/// `max_chars` characters. Paragraphs longer than that are cut.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = text.replace("\r\n", "\n");
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if paragraph.chars().count() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = paragraph.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let joined_len = if current.is_empty() {
            paragraph.chars().count()
        } else {
            current.chars().count() + 2 + paragraph.chars().count()
        };

        if joined_len > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Create a memory and fill it with every source, in order.
pub async fn load_into_memory(client: &PolyfactClient, sources: &[DataSource]) -> Result<Memory> {
    let memory = Memory::create(client).await?;
    let mut pieces = 0usize;

    for source in sources {
        let text = source.read().await?;
        for chunk in split_into_chunks(&text, DEFAULT_CHUNK_CHARS) {
            memory.add(&chunk).await?;
            pieces += 1;
        }
        debug!(memory_id = %memory.id(), ?source, "Source loaded");
    }

    info!(memory_id = %memory.id(), sources = sources.len(), pieces, "Data loaded into memory");
    Ok(memory)
}
