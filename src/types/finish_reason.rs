use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the model stopped producing a streamed response.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model reached a natural stopping point.
    Stop,

    /// The response hit `max_tokens`.
    Length,

    /// Content was omitted by the provider's filter.
    ContentFilter,

    /// The model asked to call a tool.
    ToolCalls,

    /// The model asked to call a function (legacy).
    FunctionCall,

    /// A reason this crate does not know about.
    #[serde(other)]
    Other,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::Length => write!(f, "length"),
            FinishReason::ContentFilter => write!(f, "content_filter"),
            FinishReason::ToolCalls => write!(f, "tool_calls"),
            FinishReason::FunctionCall => write!(f, "function_call"),
            FinishReason::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reasons_map_to_other() {
        let reason: FinishReason = serde_json::from_str(r#""length""#).unwrap();
        assert_eq!(reason, FinishReason::Length);
        let reason: FinishReason = serde_json::from_str(r#""something_new""#).unwrap();
        assert_eq!(reason, FinishReason::Other);
    }
}
