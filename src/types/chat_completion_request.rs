use serde::{Deserialize, Serialize};

use crate::types::{Message, Model};

/// Body of a `POST /chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The model that should answer.
    pub model: Model,

    /// The conversation, system message first.
    pub messages: Vec<Message>,

    /// Whether the response is delivered incrementally as server-sent events.
    pub stream: bool,

    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl ChatCompletionRequest {
    /// Create a new streaming request.
    pub fn new(model: Model, messages: Vec<Message>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model,
            messages,
            stream: true,
            temperature,
            max_tokens,
        }
    }
}
