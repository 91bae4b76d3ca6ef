//! Logging hook for completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows callers to capture every request
//! sent through the [`OpenAi`](crate::OpenAi) client and everything streamed back, plus
//! [`TracingClientLogger`], which forwards the same information to `tracing`.

use crate::types::{ChatCompletionChunk, ChatCompletionRequest};

/// A trait for logging completion client operations.
///
/// # Example
///
/// ```rust,ignore
/// use sciquest::{ChatCompletionChunk, ChatCompletionRequest, ClientLogger};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ChatCompletionRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &ChatCompletionChunk) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
///
///     fn log_stream_text(&self, text: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Stream complete: {text}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request immediately before it is sent.
    fn log_request(&self, request: &ChatCompletionRequest);

    /// Log an individual chunk decoded from the response stream.
    fn log_stream_chunk(&self, chunk: &ChatCompletionChunk);

    /// Log the full text assembled from a stream that ran to completion.
    fn log_stream_text(&self, text: &str);
}

/// A [`ClientLogger`] that emits `tracing` events at debug and trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingClientLogger;

impl ClientLogger for TracingClientLogger {
    fn log_request(&self, request: &ChatCompletionRequest) {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "sending chat completion request"
        );
    }

    fn log_stream_chunk(&self, chunk: &ChatCompletionChunk) {
        tracing::trace!(id = ?chunk.id, text = ?chunk.text(), "stream chunk");
    }

    fn log_stream_text(&self, text: &str) {
        tracing::debug!(chars = text.chars().count(), "stream complete");
    }
}
