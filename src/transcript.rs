//! The in-memory chat transcript and its feedback annotations.
//!
//! A [`Transcript`] is append-only: messages keep their insertion order and are never edited,
//! and the only way to remove anything is [`Transcript::reset`], which drops every message and
//! every annotation at once.  The system prompt is never part of a transcript; it is prepended to
//! the request when a completion is invoked.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Message, Role, Sentiment};

/// Ordered user/assistant messages plus per-message feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
    feedback: BTreeMap<usize, Sentiment>,
}

/// Counts of feedback annotations by sentiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackSummary {
    /// Messages marked helpful.
    pub positive: usize,
    /// Messages marked unhelpful.
    pub negative: usize,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the end of the transcript.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a system message, and for an assistant message when no
    /// user message has been appended yet.
    pub fn append(&mut self, message: Message) -> Result<()> {
        match message.role {
            Role::System => {
                return Err(Error::validation(
                    "system messages are injected at request time and never stored",
                    Some("role".to_string()),
                ));
            }
            Role::Assistant if !self.messages.iter().any(|m| m.role == Role::User) => {
                return Err(Error::validation(
                    "an assistant message must follow a user message",
                    Some("role".to_string()),
                ));
            }
            _ => {}
        }
        self.messages.push(message);
        Ok(())
    }

    /// Clears every message and every feedback annotation.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.feedback.clear();
    }

    /// Records (or overwrites) feedback for the message at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReference`] and leaves the feedback untouched when `index` is not
    /// a position in the current transcript.
    pub fn annotate(&mut self, index: usize, sentiment: Sentiment) -> Result<()> {
        if index >= self.messages.len() {
            return Err(Error::invalid_reference(index, self.messages.len()));
        }
        self.feedback.insert(index, sentiment);
        Ok(())
    }

    /// The messages, in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if no message has been appended since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The feedback recorded for `index`, if any.
    pub fn feedback(&self, index: usize) -> Option<Sentiment> {
        self.feedback.get(&index).copied()
    }

    /// Every annotation, ordered by message index.
    pub fn feedback_entries(&self) -> impl Iterator<Item = (usize, Sentiment)> + '_ {
        self.feedback.iter().map(|(idx, sentiment)| (*idx, *sentiment))
    }

    /// Counts annotations by sentiment.
    pub fn feedback_summary(&self) -> FeedbackSummary {
        self.feedback
            .values()
            .fold(FeedbackSummary::default(), |mut summary, sentiment| {
                match sentiment {
                    Sentiment::Positive => summary.positive += 1,
                    Sentiment::Negative => summary.negative += 1,
                }
                summary
            })
    }

    /// Renders the transcript as plain text, one `ROLE: content` line per message.
    pub fn export_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Writes [`Transcript::export_text`] to `path`.
    ///
    /// An empty transcript is a `Validation` error and leaves `path` untouched.
    pub fn save_export_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if self.is_empty() {
            return Err(Error::validation(
                "nothing to save yet",
                Some("transcript".to_string()),
            ));
        }
        fs::write(path.as_ref(), self.export_text())
            .map_err(|err| Error::io("failed to write transcript export", err))
    }
}
