//! Chat application module for interactive science tutoring conversations.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! sciquest client library. It supports:
//!
//! - Streaming responses with real-time token display
//! - Difficulty levels that select a fixed tutor prompt
//! - Per-message feedback and plain-text export
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing, configuration files and setting resolution
//! - [`difficulty`]: The difficulty levels and their prompts
//! - [`session`]: Core chat session management and API interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod difficulty;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{
    ChatArgs, ChatArgsError, ChatConfig, ChatConfigFile, DEFAULT_MAX_TOKENS,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, MAX_MAX_TOKENS, MAX_TEMPERATURE, MIN_MAX_TOKENS,
    MIN_TEMPERATURE, PINNED_TEMPERATURE, SessionConfig, clamp_max_tokens, clamp_temperature,
    resolve_configuration,
};
pub use difficulty::{Difficulty, parse_level};
pub use session::{
    ChatSession, DEFAULT_EXPORT_FILE, SessionStats, TurnOutcome, TurnStop, build_request,
};
