// Public modules
pub mod chat_completion_chunk;
pub mod chat_completion_request;
pub mod finish_reason;
pub mod message;
pub mod model;
pub mod sentiment;
pub mod stream_event;

// Re-exports
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use chat_completion_request::ChatCompletionRequest;
pub use finish_reason::FinishReason;
pub use message::{Message, Role};
pub use model::{KnownModel, Model};
pub use sentiment::Sentiment;
pub use stream_event::{Fragment, StreamEvent};
