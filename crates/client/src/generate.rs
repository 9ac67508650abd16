//! Generation endpoint: complete results and streamed text.
//!
//! Streaming responses are Server-Sent Events. Each `data:` line carries a
//! text chunk, either raw or as a JSON string literal (so chunks can contain
//! newlines). `data: [END]` marks the end of the generation; a connection
//! close without the marker also ends the stream.

use async_trait::async_trait;
use futures::StreamExt;
use polyfact_core::stream::DEFAULT_STREAM_BUFFER;
use polyfact_core::{
    Error, GenerationOptions, GenerationResult, GenerationStream, Generator, Result, StreamSender,
};
use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::{debug, trace};

use crate::client::PolyfactClient;

/// End-of-stream marker sent by the service.
pub const END_OF_STREAM: &str = "[END]";

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    task: &'a str,
    #[serde(flatten)]
    options: &'a GenerationOptions,
    stream: bool,
}

impl PolyfactClient {
    /// Run a generation and wait for the complete result.
    pub async fn generate(
        &self,
        task: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        debug!(
            provider = ?options.provider,
            model = ?options.model,
            web = options.web,
            chat_id = ?options.chat_id,
            "Sending generation request"
        );

        let body = GenerateBody {
            task,
            options,
            stream: false,
        };
        let request = self.request(Method::POST, "/generate")?.json(&body);
        self.execute_json(request).await
    }

    /// Run a generation and receive its text chunk by chunk.
    ///
    /// The request is sent before this returns, so HTTP-level failures are
    /// reported here; failures after the first byte arrive through the
    /// stream.
    pub async fn generate_stream(
        &self,
        task: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationStream> {
        debug!(
            provider = ?options.provider,
            model = ?options.model,
            chat_id = ?options.chat_id,
            "Sending streaming generation request"
        );

        let body = GenerateBody {
            task,
            options,
            stream: true,
        };
        let request = self
            .stream_request(Method::POST, "/generate")?
            .header(ACCEPT, "text/event-stream")
            .json(&body);
        let response = self.execute(request).await?;

        let (tx, stream) = GenerationStream::channel(DEFAULT_STREAM_BUFFER);
        tokio::spawn(pump_events(response, tx));
        Ok(stream)
    }
}

#[async_trait]
impl Generator for PolyfactClient {
    async fn generate(&self, task: &str, options: &GenerationOptions) -> Result<GenerationResult> {
        PolyfactClient::generate(self, task, options).await
    }

    async fn generate_stream(
        &self,
        task: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationStream> {
        PolyfactClient::generate_stream(self, task, options).await
    }
}

/// Read the SSE body and push decoded chunks until the end marker, the end
/// of the body, or the consumer stopping.
async fn pump_events(response: reqwest::Response, tx: StreamSender) {
    let mut bytes = response.bytes_stream();
    let mut decoder = SseDecoder::default();

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(b) => b,
            Err(e) => {
                tx.fail(Error::Network(format!("stream interrupted: {e}")))
                    .await;
                return;
            }
        };

        for event in decoder.feed(&chunk) {
            match event {
                SseEvent::Data(text) => {
                    if !tx.send(text).await {
                        debug!("Generation stream consumer stopped");
                        return;
                    }
                }
                SseEvent::End => {
                    trace!("Generation stream reached end marker");
                    return;
                }
            }
        }
    }

    // Body closed without a final newline.
    if let Some(SseEvent::Data(text)) = decoder.finish() {
        tx.send(text).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Data(String),
    End,
}

/// Incremental line decoder for the generation event stream.
///
/// Buffers raw bytes so multi-byte characters split across network chunks
/// decode correctly.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    ended: bool,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.ended {
            return events;
        }

        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.decode_line(line.trim_end_matches(['\n', '\r'])) {
                let is_end = event == SseEvent::End;
                events.push(event);
                if is_end {
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    fn finish(&mut self) -> Option<SseEvent> {
        if self.ended || self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.decode_line(line.trim_end_matches('\r'))
    }

    fn decode_line(&mut self, line: &str) -> Option<SseEvent> {
        // Blank separators, comments, and non-data fields carry no text.
        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data.trim() == END_OF_STREAM {
            self.ended = true;
            return Some(SseEvent::End);
        }

        if data.starts_with('"') {
            if let Ok(text) = serde_json::from_str::<String>(data) {
                return Some(SseEvent::Data(text));
            }
        }

        Some(SseEvent::Data(data.to_string()))
    }
}
