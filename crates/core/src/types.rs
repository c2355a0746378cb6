use std::str::FromStr;

use aiko_llm::provider::{ChatMessage, Role};
use serde::{Deserialize, Serialize};

/// One role-tagged entry of a prompt context. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into() }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

impl From<Turn> for ChatMessage {
    fn from(turn: Turn) -> Self {
        ChatMessage::new(turn.role, turn.text)
    }
}

/// Polarity reported by the sentiment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

/// Sentiment of one message: polarity plus a confidence magnitude (0–100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: i64,
}

impl Sentiment {
    pub fn new(label: SentimentLabel, score: i64) -> Self {
        Self { label, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_converts_to_chat_message() {
        let msg: ChatMessage = Turn::user("hi").into();
        assert_eq!(msg, ChatMessage::user("hi"));
    }

    #[test]
    fn sentiment_label_parses_case_insensitively() {
        assert_eq!("Positive".parse(), Ok(SentimentLabel::Positive));
        assert_eq!("NEGATIVE".parse(), Ok(SentimentLabel::Negative));
        assert!("mixed".parse::<SentimentLabel>().is_err());
    }
}
