//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the transcript and settings of one
//! conversation and drives streaming completions.  Every user action (send, reset, annotate,
//! change a setting) is a method on the session; there is no ambient state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;

use crate::Renderer;
use crate::chat::config::{
    ChatConfig, MAX_MAX_TOKENS, MAX_TEMPERATURE, MIN_MAX_TOKENS, MIN_TEMPERATURE, SessionConfig,
};
use crate::chat::difficulty::Difficulty;
use crate::client::OpenAi;
use crate::client_logger::TracingClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_FEEDBACK, SESSION_RESETS, SESSION_TRUNCATED_TURNS, SESSION_TURNS,
};
use crate::transcript::{FeedbackSummary, Transcript};
use crate::types::{ChatCompletionRequest, FinishReason, Fragment, Message, Model, Sentiment};

/// Default file name for `/save` when no export path is configured.
pub const DEFAULT_EXPORT_FILE: &str = "sciquest-transcript.txt";

/// How a streamed turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStop {
    /// The stream ran to completion, with the provider's finish reason if it sent one.
    Finished(Option<FinishReason>),

    /// The user interrupted the stream; whatever arrived was kept.
    Interrupted,
}

/// The result of a successful [`ChatSession::send_streaming`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Transcript index of the appended assistant message, if one was appended.
    pub message_index: Option<usize>,
    /// Number of text fragments received.
    pub fragments: usize,
    /// How the stream ended.
    pub stop: TurnStop,
}

/// A chat session that manages conversation state and API interactions.
///
/// A session without a client is inert: it accepts configuration changes but refuses to send
/// until [`ChatSession::set_api_key`] or [`ChatSession::set_client`] supplies a credential.
pub struct ChatSession {
    client: Option<OpenAi>,
    config: ChatConfig,
    transcript: Transcript,
}

/// A snapshot of the session for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The difficulty level, or `None` in free configuration.
    pub difficulty: Option<Difficulty>,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Feedback counts by sentiment.
    pub feedback: FeedbackSummary,
    /// The system prompt sent with the next request.
    pub system_prompt: String,
    /// The temperature sent with the next request.
    pub temperature: f32,
    /// The maximum tokens per response.
    pub max_tokens: u32,
    /// Whether a credential is available.
    pub has_credential: bool,
    /// Where `/save` writes by default.
    pub export_path: PathBuf,
}

impl ChatSession {
    /// Creates a session without a client.
    pub fn new(config: ChatConfig) -> Self {
        Self {
            client: None,
            config,
            transcript: Transcript::new(),
        }
    }

    /// Creates a session with the given client and configuration.
    pub fn with_client(client: OpenAi, config: ChatConfig) -> Self {
        Self {
            client: Some(client),
            ..Self::new(config)
        }
    }

    /// Creates a session, building a client from `api_key` or the environment.
    ///
    /// A missing credential is not an error here: the session starts inert instead.  Any other
    /// failure to build the client is returned.
    pub fn connect(config: ChatConfig, api_key: Option<String>) -> Result<Self> {
        let mut session = Self::new(config);
        match session.build_client(api_key) {
            Ok(client) => session.client = Some(client),
            Err(err) if err.is_missing_credential() => {
                tracing::info!("no API key available; session starts without a client");
            }
            Err(err) => return Err(err),
        }
        Ok(session)
    }

    /// Supplies an API key, replacing any existing client.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> Result<()> {
        let client = self.build_client(Some(api_key.into()))?;
        self.client = Some(client);
        Ok(())
    }

    /// Replaces the client.
    pub fn set_client(&mut self, client: OpenAi) {
        self.client = Some(client);
    }

    /// Returns true if the session can contact the API.
    pub fn has_credential(&self) -> bool {
        self.client.is_some()
    }

    fn build_client(&self, api_key: Option<String>) -> Result<OpenAi> {
        let client =
            OpenAi::with_options(api_key, self.config.base_url.clone(), self.config.timeout)?;
        Ok(client.with_logger(Arc::new(TracingClientLogger)))
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Adds the user message to the transcript
    /// 2. Sends a streaming request built from the resolved configuration
    /// 3. Renders fragments as they arrive
    /// 4. Adds the assistant response to the transcript
    ///
    /// If the user interrupts, the partial answer is kept and the outcome reports
    /// [`TurnStop::Interrupted`].  If the stream fails after at least one fragment, the partial
    /// answer is kept and the error is returned.  If the request fails before any fragment, the
    /// user message stays and no assistant message is added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] without touching the transcript when no client is
    /// configured, and the invocation error when the request or stream fails.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let Some(client) = self.client.as_ref() else {
            return Err(Error::missing_credential(
                "no API key has been provided for this session",
            ));
        };

        self.transcript.append(Message::user(user_input))?;
        SESSION_TURNS.click();
        let request = build_request(&self.config.resolve(), &self.transcript);
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "sending chat turn"
        );

        let mut fragments = match client.stream_text(request).await {
            Ok(fragments) => fragments,
            Err(err) => {
                tracing::warn!(error = %err, "chat turn failed before streaming");
                return Err(err);
            }
        };

        let mut answer = String::new();
        let mut count = 0usize;
        let mut finish_reason = None;
        let mut interrupted = false;
        let mut failure = None;
        loop {
            if renderer.should_interrupt() {
                interrupted = true;
                break;
            }
            match fragments.next().await {
                Some(Ok(Fragment::Text(text))) => {
                    renderer.print_text(&text);
                    answer.push_str(&text);
                    count += 1;
                }
                Some(Ok(Fragment::Finished(reason))) => finish_reason = Some(reason),
                Some(Err(err)) => {
                    failure = Some(err);
                    break;
                }
                None => break,
            }
        }
        drop(fragments);

        if let Some(err) = failure {
            if count > 0 {
                renderer.finish_response();
                self.transcript.append(Message::assistant(answer))?;
                SESSION_TRUNCATED_TURNS.click();
            }
            tracing::warn!(error = %err, fragments = count, "chat turn failed mid-stream");
            return Err(err);
        }

        if interrupted {
            renderer.print_interrupted();
            let message_index = if count > 0 {
                self.transcript.append(Message::assistant(answer))?;
                SESSION_TRUNCATED_TURNS.click();
                Some(self.transcript.len() - 1)
            } else {
                None
            };
            tracing::info!(fragments = count, "chat turn interrupted");
            return Ok(TurnOutcome {
                message_index,
                fragments: count,
                stop: TurnStop::Interrupted,
            });
        }

        renderer.finish_response();
        self.transcript.append(Message::assistant(answer))?;
        if finish_reason == Some(FinishReason::Length) {
            renderer.print_info("[response reached the max_tokens limit]");
        }
        tracing::debug!(fragments = count, finish_reason = ?finish_reason, "chat turn complete");
        Ok(TurnOutcome {
            message_index: Some(self.transcript.len() - 1),
            fragments: count,
            stop: TurnStop::Finished(finish_reason),
        })
    }

    /// Clears the conversation history and every feedback annotation.
    pub fn reset(&mut self) {
        self.transcript.reset();
        SESSION_RESETS.click();
        tracing::info!("session reset");
    }

    /// Records feedback for the message at zero-based `index`.
    pub fn annotate(&mut self, index: usize, sentiment: Sentiment) -> Result<()> {
        self.transcript.annotate(index, sentiment)?;
        SESSION_FEEDBACK.click();
        tracing::debug!(index, %sentiment, "feedback recorded");
        Ok(())
    }

    /// Returns the transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// Renders the transcript as plain text.
    pub fn export_text(&self) -> String {
        self.transcript.export_text()
    }

    /// Saves the plain-text export to `path`.
    pub fn save_export_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.transcript.save_export_to(path)?;
        tracing::info!(
            path = %path.display(),
            messages = self.transcript.len(),
            "transcript exported"
        );
        Ok(())
    }

    /// The path `/save` writes to when none is given.
    pub fn export_path(&self) -> PathBuf {
        self.config
            .export_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE))
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the settings the next request will be built from.
    pub fn resolved_config(&self) -> SessionConfig {
        self.config.resolve()
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Selects a difficulty level, or free configuration with `None`.
    pub fn set_difficulty(&mut self, difficulty: Option<Difficulty>) {
        self.config.difficulty = difficulty;
    }

    /// Returns the current difficulty level.
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.config.difficulty
    }

    /// Sets the free system prompt; `None` restores the default prompt.
    ///
    /// # Errors
    ///
    /// Returns a validation error while a difficulty level dictates the prompt.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) -> Result<()> {
        if self.config.is_pinned() {
            return Err(Error::validation(
                "the system prompt is set by the difficulty level; switch to /level off first",
                Some("system".to_string()),
            ));
        }
        self.config.system_prompt = prompt;
        Ok(())
    }

    /// Sets the sampling temperature.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a value outside `[0, 2]` or while a difficulty level pins
    /// the temperature.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        if self.config.is_pinned() {
            return Err(Error::validation(
                "the temperature is set by the difficulty level; switch to /level off first",
                Some("temperature".to_string()),
            ));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(Error::validation(
                format!("temperature must be between {MIN_TEMPERATURE} and {MAX_TEMPERATURE}"),
                Some("temperature".to_string()),
            ));
        }
        self.config.temperature = Some(temperature);
        Ok(())
    }

    /// Sets the maximum tokens per response.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a value outside `[100, 4000]`.
    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<()> {
        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&max_tokens) {
            return Err(Error::validation(
                format!("max_tokens must be between {MIN_MAX_TOKENS} and {MAX_MAX_TOKENS}"),
                Some("max_tokens".to_string()),
            ));
        }
        self.config.max_tokens = max_tokens;
        Ok(())
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let resolved = self.config.resolve();
        SessionStats {
            model: resolved.model,
            difficulty: self.config.difficulty,
            message_count: self.transcript.len(),
            feedback: self.transcript.feedback_summary(),
            system_prompt: resolved.system_prompt,
            temperature: resolved.temperature,
            max_tokens: resolved.max_response_tokens,
            has_credential: self.has_credential(),
            export_path: self.export_path(),
        }
    }
}

/// Builds the completion request for `transcript` under `config`.
///
/// The result holds exactly one system message, at position 0, followed by every transcript
/// message in order.
pub fn build_request(config: &SessionConfig, transcript: &Transcript) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(Message::system(config.system_prompt.clone()));
    messages.extend(transcript.messages().iter().cloned());
    ChatCompletionRequest::new(
        config.model.clone(),
        messages,
        config.temperature,
        config.max_response_tokens,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::config::{PINNED_TEMPERATURE, resolve_configuration};
    use crate::types::{KnownModel, Role};

    struct NullRenderer;

    impl Renderer for NullRenderer {
        fn print_text(&mut self, _: &str) {}
        fn print_error(&mut self, _: &str) {}
        fn print_info(&mut self, _: &str) {}
        fn finish_response(&mut self) {}
    }

    fn session() -> ChatSession {
        let client = OpenAi::new(Some("test-key".to_string())).unwrap();
        ChatSession::with_client(client, ChatConfig::default())
    }

    #[test]
    fn new_session_empty() {
        let session = session();
        assert_eq!(session.message_count(), 0);
        assert!(session.has_credential());
        assert!(!ChatSession::new(ChatConfig::default()).has_credential());
    }

    #[test]
    fn first_turn_request_has_two_messages() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("What is gravity?")).unwrap();
        let config = resolve_configuration(Difficulty::Intermediate);

        let request = build_request(&config, &transcript);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, config.system_prompt);
        assert_eq!(request.messages[1], Message::user("What is gravity?"));
        assert!(request.stream);
    }

    #[test]
    fn follow_up_request_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("u1")).unwrap();
        transcript.append(Message::assistant("a1")).unwrap();
        transcript.append(Message::user("u2")).unwrap();
        let config = ChatConfig::free().resolve();

        let request = build_request(&config, &transcript);
        let roles: Vec<_> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        let contents: Vec<_> = request.messages[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["u1", "a1", "u2"]);
        assert_eq!(
            request
                .messages
                .iter()
                .filter(|m| m.role == Role::System)
                .count(),
            1
        );
    }

    #[test]
    fn request_length_is_transcript_plus_one() {
        let mut transcript = Transcript::new();
        let config = ChatConfig::default().resolve();
        for n in 0..6 {
            assert_eq!(build_request(&config, &transcript).messages.len(), n + 1);
            let message = if n % 2 == 0 {
                Message::user(format!("q{n}"))
            } else {
                Message::assistant(format!("a{n}"))
            };
            transcript.append(message).unwrap();
        }
    }

    #[tokio::test]
    async fn send_without_credential_changes_nothing() {
        let mut session = ChatSession::new(ChatConfig::default());
        let err = session
            .send_streaming("hello", &mut NullRenderer)
            .await
            .unwrap_err();
        assert!(err.is_missing_credential());
        assert_eq!(session.message_count(), 0);
    }

    #[test]
    fn reset_clears_transcript() {
        let mut session = session();
        for idx in 0..5 {
            let message = if idx % 2 == 0 {
                Message::user("q")
            } else {
                Message::assistant("a")
            };
            session.transcript.append(message).unwrap();
        }
        session.annotate(1, Sentiment::Positive).unwrap();
        assert_eq!(session.message_count(), 5);

        session.reset();
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.stats().feedback, FeedbackSummary::default());

        session.transcript.append(Message::user("again")).unwrap();
        assert_eq!(session.message_count(), 1);
    }

    #[test]
    fn reset_keeps_configuration() {
        let mut session = session();
        session.set_model(Model::Known(KnownModel::Gpt4o));
        session.set_difficulty(Some(Difficulty::Advanced));
        session.set_max_tokens(2500).unwrap();
        session.transcript.append(Message::user("q")).unwrap();
        session.transcript.append(Message::assistant("a")).unwrap();
        session.annotate(1, Sentiment::Negative).unwrap();

        let config = session.config().clone();
        let resolved = session.resolved_config();
        session.reset();

        assert_eq!(session.message_count(), 0);
        assert_eq!(session.config(), &config);
        assert_eq!(session.resolved_config(), resolved);
        assert_eq!(resolved.model, Model::Known(KnownModel::Gpt4o));
        assert_eq!(resolved.system_prompt, Difficulty::Advanced.system_prompt());
        assert_eq!(resolved.max_response_tokens, 2500);
        assert!(session.has_credential());
    }

    #[test]
    fn annotate_out_of_range() {
        let mut session = session();
        let err = session.annotate(0, Sentiment::Negative).unwrap_err();
        assert!(err.is_invalid_reference());
    }

    #[test]
    fn set_model() {
        let mut session = session();
        assert_eq!(session.model(), &Model::Known(KnownModel::Gpt35Turbo));

        session.set_model(Model::Known(KnownModel::Gpt4o));
        assert_eq!(session.model(), &Model::Known(KnownModel::Gpt4o));
    }

    #[test]
    fn pinned_settings_reject_edits() {
        let mut session = session();
        session.set_difficulty(Some(Difficulty::Beginner));
        assert!(session.set_system_prompt(Some("x".to_string())).is_err());
        assert!(session.set_temperature(0.2).is_err());

        let resolved = session.resolved_config();
        assert_eq!(resolved.system_prompt, Difficulty::Beginner.system_prompt());
        assert_eq!(resolved.temperature, PINNED_TEMPERATURE);
    }

    #[test]
    fn free_settings_are_validated() {
        let mut session = session();
        session.set_difficulty(None);
        session
            .set_system_prompt(Some("Be helpful".to_string()))
            .unwrap();
        session.set_temperature(0.4).unwrap();
        assert!(session.set_temperature(2.5).unwrap_err().is_validation());
        session.set_max_tokens(2000).unwrap();
        assert!(session.set_max_tokens(50).unwrap_err().is_validation());

        let stats = session.stats();
        assert_eq!(stats.system_prompt, "Be helpful");
        assert_eq!(stats.temperature, 0.4);
        assert_eq!(stats.max_tokens, 2000);
        assert_eq!(stats.difficulty, None);

        session.set_system_prompt(None).unwrap();
        assert_eq!(
            session.resolved_config().system_prompt,
            crate::chat::config::DEFAULT_SYSTEM_PROMPT
        );
    }

    #[test]
    fn save_export_after_reset_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let mut session = session();
        session
            .transcript
            .append(Message::user("What is light?"))
            .unwrap();
        session.reset();
        assert!(session.save_export_to(&path).unwrap_err().is_validation());
        assert!(!path.exists());
    }

    #[test]
    fn export_path_defaults() {
        let session = session();
        assert_eq!(session.export_path(), PathBuf::from(DEFAULT_EXPORT_FILE));
        let session = ChatSession::new(
            ChatConfig::default().with_export_path(Some(PathBuf::from("chat.txt"))),
        );
        assert_eq!(session.export_path(), PathBuf::from("chat.txt"));
    }
}
