use crate::types::{ChatCompletionChunk, FinishReason};

/// One decoded item of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A `chat.completion.chunk` payload.
    Chunk(ChatCompletionChunk),

    /// The `[DONE]` sentinel; nothing follows it.
    Done,
}

/// One piece of a streamed answer, as handed to the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Text to append to the answer.
    Text(String),

    /// The provider reported why generation ended.
    Finished(FinishReason),
}
