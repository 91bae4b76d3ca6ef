//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

use crate::chat::config::{MAX_MAX_TOKENS, MAX_TEMPERATURE, MIN_MAX_TOKENS, MIN_TEMPERATURE};
use crate::chat::difficulty::{Difficulty, parse_level};
use crate::types::Sentiment;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation, dropping history and feedback.
    New,

    /// Change the model.
    Model(String),

    /// List the known models.
    Models,

    /// Select a difficulty level, or free configuration with `None`.
    Level(Option<Difficulty>),

    /// Set the free system prompt.
    /// `None` restores the default prompt.
    System(Option<String>),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Record feedback on a message, by its one-based number.
    Feedback(usize, Sentiment),

    /// Save the plain-text transcript, optionally to a specific file.
    Save(Option<String>),

    /// Print the transcript with feedback markers.
    History,

    /// Supply an API key.
    Key(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics (message count, current model, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use sciquest::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/level beginner").is_some());
/// assert!(parse_command("Why is the sky blue?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" | "clear" | "reset" => ChatCommand::New,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" => ChatCommand::Models,
        "level" => match argument.map(parse_level) {
            Some(Ok(level)) => ChatCommand::Level(level),
            Some(Err(err)) => ChatCommand::Invalid(format!("/level {err}")),
            None => ChatCommand::Invalid(
                "/level requires beginner, intermediate, advanced or off".to_string(),
            ),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "history" => ChatCommand::History,
        "max_tokens" => match argument {
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) if (MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&value) => {
                    ChatCommand::MaxTokens(value)
                }
                _ => ChatCommand::Invalid(format!(
                    "/max_tokens expects an integer between {MIN_MAX_TOKENS} and {MAX_MAX_TOKENS}"
                )),
            },
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "temperature" => match argument {
            Some(arg) => match parse_f32_in_range(arg, MIN_TEMPERATURE, MAX_TEMPERATURE) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "like" => parse_feedback_command(argument, Sentiment::Positive, "/like"),
        "dislike" => parse_feedback_command(argument, Sentiment::Negative, "/dislike"),
        "save" => ChatCommand::Save(argument.map(|s| s.to_string())),
        "key" => match argument {
            Some(key) => ChatCommand::Key(key.to_string()),
            None => ChatCommand::Invalid("/key requires an API key".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_feedback_command(argument: Option<&str>, sentiment: Sentiment, name: &str) -> ChatCommand {
    match argument {
        Some(arg) => match arg.parse::<usize>() {
            Ok(number) if number > 0 => ChatCommand::Feedback(number, sentiment),
            _ => ChatCommand::Invalid(format!("{name} expects a message number from /history")),
        },
        None => ChatCommand::Invalid(format!("{name} requires a message number")),
    }
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new conversation (aliases: /clear, /reset)
  /model <name>          Change the model (e.g., /model gpt-4o)
  /models                List known models
  /level <level>         beginner, intermediate, advanced, or off for free mode
  /system [prompt]       Set system prompt in free mode (no argument restores default)
  /temperature <v>       Set temperature 0.0-2.0 in free mode
  /max_tokens <n>        Set maximum response tokens (100-4000)
  /like <n>              Mark message n (see /history) as helpful
  /dislike <n>           Mark message n (see /history) as unhelpful
  /history               Show the conversation with message numbers
  /save [file]           Save the conversation as plain text
  /key <api-key>         Provide an API key
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
