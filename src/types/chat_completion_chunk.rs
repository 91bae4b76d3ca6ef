use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, Role};

/// One `chat.completion.chunk` object from a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Identifier shared by every chunk of one completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The model that produced the chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Incremental choices; a single-choice request yields at most one.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// The incremental part of one choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Index of the choice this delta belongs to.
    #[serde(default)]
    pub index: u32,

    /// The new content.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Set on the final chunk of the choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Role and text deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Present on the first chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Text to append to the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// The text fragment carried by the first choice, if it is non-empty.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }

    /// The finish reason of the first choice, if this is its last chunk.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|choice| choice.finish_reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_chunk() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "delta": {"content": "Gra"}, "logprobs": null, "finish_reason": null}]
        }"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(chunk.text(), Some("Gra"));
        assert_eq!(chunk.finish_reason(), None);
    }

    #[test]
    fn role_only_and_final_chunks_have_no_text() {
        let first: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]}"#,
        )
        .unwrap();
        assert_eq!(first.text(), None);
        assert_eq!(first.choices[0].delta.role, Some(Role::Assistant));

        let last: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}"#,
        )
        .unwrap();
        assert_eq!(last.text(), None);
        assert_eq!(last.finish_reason(), Some(FinishReason::Stop));
    }

    #[test]
    fn usage_only_chunk_has_no_choices() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices": [], "usage": {"total_tokens": 9}}"#).unwrap();
        assert!(chunk.text().is_none());
        assert!(chunk.finish_reason().is_none());
    }
}
