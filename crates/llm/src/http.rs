//! HTTP-based LLM providers.
//!
//! Supports OpenAI-compatible APIs (OpenAI, Google Gemini, DeepSeek, etc.)
//! and Anthropic's native Messages API. Text only.

use crate::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmError, LlmProvider, Role, TokenUsage,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Inferred provider kind from model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
    /// Falls back to OpenAI-compatible format.
    Unknown,
}

impl ProviderKind {
    /// Infer provider from model name prefix.
    pub fn from_model(model: &str) -> Self {
        let m = model.to_lowercase();
        if m.starts_with("gpt-")
            || m.starts_with("o1-")
            || m.starts_with("o3-")
            || m.starts_with("o4-")
        {
            Self::OpenAi
        } else if m.starts_with("claude-") {
            Self::Anthropic
        } else if m.starts_with("gemini-") {
            Self::Google
        } else if m.starts_with("deepseek-") {
            Self::DeepSeek
        } else {
            Self::Unknown
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi | Self::Unknown => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Self::DeepSeek => "https://api.deepseek.com",
        }
    }

    fn is_anthropic(self) -> bool {
        matches!(self, Self::Anthropic)
    }
}

// ── OpenAI-compatible request/response types ──

#[derive(Serialize)]
struct OaiRequest {
    model: String,
    messages: Vec<OaiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OaiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OaiResponse {
    choices: Vec<OaiChoice>,
    usage: Option<OaiUsage>,
}

#[derive(Deserialize)]
struct OaiChoice {
    message: OaiChoiceMessage,
}

#[derive(Deserialize)]
struct OaiChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct OaiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ── Anthropic Messages API types ──

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ── Provider ──

/// HTTP-based LLM provider. Handles both OpenAI-compatible and Anthropic APIs.
pub struct HttpProvider {
    kind: ProviderKind,
    model: String,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpProvider {
    /// Build from model name + API key + optional base URL override.
    pub fn new(model: String, api_key: String, base_url: Option<String>) -> Self {
        let kind = ProviderKind::from_model(&model);
        let base = base_url.unwrap_or_else(|| kind.default_base_url().to_owned());
        Self {
            kind,
            model,
            client: reqwest::Client::new(),
            base_url: base.trim_end_matches('/').to_owned(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        if self.kind.is_anthropic() {
            format!("{}/v1/messages", self.base_url)
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

/// Parse error response, returning RateLimited for 429.
fn check_error(status: reqwest::StatusCode, body: String) -> LlmError {
    tracing::warn!(status = status.as_u16(), "completion request rejected");
    if status.as_u16() == 429 {
        LlmError::RateLimited
    } else {
        LlmError::RequestFailed(format!("{status}: {body}"))
    }
}

/// Split a conversation for the Anthropic API: the leading run of system
/// messages becomes the top-level system prompt, later system messages are
/// sent as user turns so their position in the conversation is preserved.
/// The last message is always sent as a turn, so the model has something to answer.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
    let lead = messages
        .iter()
        .take_while(|m| m.role == Role::System)
        .count()
        .min(messages.len().saturating_sub(1));
    let system = (lead > 0).then(|| {
        messages[..lead]
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    });
    let rest = messages[lead..]
        .iter()
        .map(|m| AnthropicMessage {
            role: match m.role {
                Role::Assistant => "assistant",
                Role::System | Role::User => "user",
            },
            content: m.content.clone(),
        })
        .collect();
    (system, rest)
}

impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        match self.kind {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Unknown => "unknown",
        }
    }

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        if self.kind.is_anthropic() {
            Box::pin(self.complete_anthropic(request))
        } else {
            Box::pin(self.complete_openai(request))
        }
    }
}

impl HttpProvider {
    /// OpenAI-compatible completion (OpenAI, Gemini, DeepSeek, Unknown).
    async fn complete_openai(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = OaiRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(|m| OaiMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            }).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp = self.client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(check_error(status, text));
        }

        let api: OaiResponse = resp.json().await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let content = api.choices.into_iter().next()
            .map(|c| c.message.content).unwrap_or_default();
        let usage = api.usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse { content, usage })
    }

    /// Anthropic Messages API completion.
    async fn complete_anthropic(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (system, messages) = split_system(&request.messages);

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system,
            messages,
            temperature: request.temperature,
        };

        let resp = self.client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(check_error(status, text));
        }

        let api: AnthropicResponse = resp.json().await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let content: String = api.content.iter().filter_map(|b| match b {
            AnthropicResponseBlock::Text { text } => Some(text.as_str()),
            AnthropicResponseBlock::Other => None,
        }).collect::<Vec<_>>().join("");

        let usage = api.usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse { content, usage })
    }
}

/// Build an LlmProvider from the default environment variables.
/// Reads `AIKO_LLM_MODEL`, `AIKO_LLM_API_KEY`, optionally `AIKO_LLM_BASE_URL`.
/// Returns `None` if model or key is not set.
pub fn from_env() -> Option<HttpProvider> {
    let model = std::env::var("AIKO_LLM_MODEL").ok()?;
    let api_key = std::env::var("AIKO_LLM_API_KEY").ok()?;
    let base_url = std::env::var("AIKO_LLM_BASE_URL").ok();
    tracing::info!(model = %model, custom_base_url = base_url.is_some(), "completion provider configured");
    Some(HttpProvider::new(model, api_key, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_provider_from_model() {
        assert_eq!(ProviderKind::from_model("gpt-3.5-turbo"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_model("o3-mini"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_model("claude-sonnet-4-6"), ProviderKind::Anthropic);
        assert_eq!(ProviderKind::from_model("gemini-2.0-flash"), ProviderKind::Google);
        assert_eq!(ProviderKind::from_model("deepseek-chat"), ProviderKind::DeepSeek);
        assert_eq!(ProviderKind::from_model("llama-3"), ProviderKind::Unknown);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(ProviderKind::from_model("GPT-4o"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_model("Claude-3-opus"), ProviderKind::Anthropic);
    }

    #[test]
    fn openai_endpoint() {
        let p = HttpProvider::new("gpt-4o".into(), "sk-test".into(), None);
        assert_eq!(p.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn anthropic_endpoint() {
        let p = HttpProvider::new("claude-sonnet-4-6".into(), "sk-ant-test".into(), None);
        assert_eq!(p.endpoint(), "https://api.anthropic.com/v1/messages");
        assert_eq!(p.name(), "anthropic");
    }

    #[test]
    fn custom_base_url_override() {
        let p = HttpProvider::new(
            "gpt-4o".into(),
            "sk-test".into(),
            Some("https://my-proxy.com/v1/".into()),
        );
        assert_eq!(p.endpoint(), "https://my-proxy.com/v1/chat/completions");
    }

    #[test]
    fn leading_system_turns_become_system_prompt() {
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::system("scenario"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::system("EVENT: someone followed"),
        ];
        let (system, rest) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("persona\n\nscenario"));
        let roles: Vec<_> = rest.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(rest[2].content, "EVENT: someone followed");
    }

    #[test]
    fn no_system_prompt_without_leading_system_turn() {
        let (system, rest) = split_system(&[ChatMessage::user("hi")]);
        assert!(system.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn all_system_conversation_keeps_last_as_user_turn() {
        let messages = vec![
            ChatMessage::system("You are Aiko."),
            ChatMessage::system("at the beach"),
            ChatMessage::system("EVENT: amy just followed you on Twitch."),
        ];
        let (system, rest) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("You are Aiko.\n\nat the beach"));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].role, "user");
        assert_eq!(rest[0].content, "EVENT: amy just followed you on Twitch.");
    }

    #[test]
    fn single_system_message_is_sent_as_turn() {
        let (system, rest) = split_system(&[ChatMessage::system("hello")]);
        assert!(system.is_none());
        assert_eq!(rest.len(), 1);
    }
}
