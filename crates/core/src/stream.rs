//! Push-style generation streams.
//!
//! A producer task pushes text chunks through a [`StreamSender`]; the caller
//! consumes them from the paired [`GenerationStream`] until the producer
//! finishes. Stopping the stream is a flag the producer checks before every
//! push, not an interruption of the in-flight request.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{Error, Result};

/// Chunks buffered between the producer and the consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// The consuming half of a generation stream.
pub struct GenerationStream {
    inner: ReceiverStream<Result<String>>,
    stopped: Arc<AtomicBool>,
}

/// The producing half of a generation stream.
#[derive(Clone)]
pub struct StreamSender {
    tx: mpsc::Sender<Result<String>>,
    stopped: Arc<AtomicBool>,
}

impl GenerationStream {
    /// Create a connected sender/stream pair.
    pub fn channel(buffer: usize) -> (StreamSender, GenerationStream) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let stopped = Arc::new(AtomicBool::new(false));
        (
            StreamSender {
                tx,
                stopped: stopped.clone(),
            },
            GenerationStream {
                inner: ReceiverStream::new(rx),
                stopped,
            },
        )
    }

    /// A stream that yields `text` once and then ends.
    pub fn from_text(text: impl Into<String>) -> Self {
        let (sender, stream) = Self::channel(1);
        // Capacity 1 and a fresh channel: this cannot fail.
        let _ = sender.tx.try_send(Ok(text.into()));
        stream
    }

    /// Receive the next chunk, or `None` once the stream has ended.
    pub async fn next_chunk(&mut self) -> Option<Result<String>> {
        if self.is_stopped() {
            return None;
        }
        tokio_stream::StreamExt::next(&mut self.inner).await
    }

    /// Stop consuming. The producer sees the flag on its next push.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.inner.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Drain the stream into a single string.
    ///
    /// The first error ends the drain and is returned.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

impl Stream for GenerationStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_stopped() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl std::fmt::Debug for GenerationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationStream")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl StreamSender {
    /// Push a chunk. Returns `false` when the consumer stopped or went away,
    /// in which case the producer should wind down.
    pub async fn send(&self, chunk: impl Into<String>) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.tx.send(Ok(chunk.into())).await.is_ok()
    }

    /// Push a terminal error.
    pub async fn fail(&self, error: Error) {
        if !self.is_stopped() {
            let _ = self.tx.send(Err(error)).await;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}
