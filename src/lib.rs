// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod render;
pub mod sse;
pub mod transcript;
pub mod types;

// Re-exports
pub use client::{API_KEY_ENV, ChunkStream, FragmentStream, OpenAi};
pub use client_logger::{ClientLogger, TracingClientLogger};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use transcript::{FeedbackSummary, Transcript};
pub use types::*;
