use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// A single role-tagged message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LLM completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Prompt / completion / total token counts reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self { prompt, completion, total: prompt + completion }
    }
}

/// LLM completion response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// Error type for LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("rate limited")]
    RateLimited,
    #[error("request failed: {0}")]
    RequestFailed(String),
}

/// Trait for LLM providers (OpenAI, Claude, Gemini, etc.)
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>>;
}

/// Test provider: returns a fixed response and remembers what it was sent.
#[derive(Debug)]
pub struct MockProvider {
    pub response: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Messages of the most recent request, if any.
    pub fn last_messages(&self) -> Option<Vec<ChatMessage>> {
        self.requests
            .lock()
            .ok()
            .and_then(|reqs| reqs.last().map(|r| r.messages.clone()))
    }

    /// Number of completions served so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|reqs| reqs.len()).unwrap_or(0)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(request);
        }
        let content = self.response.clone();
        Box::pin(async move {
            Ok(CompletionResponse {
                content,
                usage: TokenUsage::new(10, 20),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user(text)],
            max_tokens: 100,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn mock_provider_returns_response() {
        let mock = MockProvider::new("hello aiko");
        let resp = mock.complete(request("hi")).await.unwrap();
        assert_eq!(resp.content, "hello aiko");
        assert_eq!(resp.usage.total, 30);
    }

    #[tokio::test]
    async fn mock_provider_records_requests() {
        let mock = MockProvider::new("ok");
        assert!(mock.last_messages().is_none());
        mock.complete(request("first")).await.unwrap();
        mock.complete(request("second")).await.unwrap();
        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.last_messages().unwrap(), vec![ChatMessage::user("second")]);
    }

    #[test]
    fn token_usage_totals() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total, 150);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hey")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hey"}"#);
    }
}
