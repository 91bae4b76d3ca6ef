use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A thumbs-up or thumbs-down attached to a transcript message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// The answer was helpful.
    Positive,

    /// The user wants a better answer.
    Negative,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" | "good" | "up" | "like" => Ok(Sentiment::Positive),
            "negative" | "bad" | "down" | "dislike" => Ok(Sentiment::Negative),
            _ => Err(format!("unknown sentiment: {s}")),
        }
    }
}
