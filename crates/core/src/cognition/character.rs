use std::sync::Arc;
use std::time::Duration;

use aiko_llm::provider::{ChatMessage, CompletionRequest, LlmError, LlmProvider, Role, TokenUsage};

use crate::config::AikoCfg;
use crate::memory::ConversationMemory;

#[derive(Debug, thiserror::Error)]
pub enum CharacterError {
    #[error("completion failed: {0}")]
    Llm(#[from] LlmError),
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
}

/// A generated reply plus what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub usage: TokenUsage,
}

/// The character: conversation memory bound to a completion provider.
pub struct Character {
    name: String,
    memory: ConversationMemory,
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
    session_tokens: u64,
}

impl Character {
    pub fn new(cfg: &AikoCfg, memory: ConversationMemory, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            name: cfg.character_name.clone(),
            memory,
            llm,
            timeout: Duration::from_secs(cfg.completion_timeout_secs),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            session_tokens: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    pub fn session_tokens(&self) -> u64 {
        self.session_tokens
    }

    /// Answer `message`. System-role messages are directives: only the reply
    /// is remembered. Anything else is remembered as a user/assistant pair.
    pub async fn interact(
        &mut self,
        message: &str,
        use_system_role: bool,
    ) -> Result<Reply, CharacterError> {
        let messages: Vec<ChatMessage> = self
            .memory
            .build_request(message, use_system_role)
            .into_iter()
            .map(Into::into)
            .collect();
        let request = CompletionRequest {
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| CharacterError::Timeout(self.timeout))??;

        if !use_system_role {
            self.memory.append_turn(message, Role::User);
        }
        self.memory.append_turn(response.content.clone(), Role::Assistant);

        self.session_tokens += u64::from(response.usage.total);
        tracing::info!(
            provider = self.llm.name(),
            prompt_tokens = response.usage.prompt,
            completion_tokens = response.usage.completion,
            total_tokens = response.usage.total,
            session_tokens = self.session_tokens,
            "completion received"
        );

        Ok(Reply {
            text: strip_name_prefix(&response.content, &self.name).to_owned(),
            usage: response.usage,
        })
    }
}

/// Drop a leading `"<name>:"` the model sometimes echoes.
pub fn strip_name_prefix<'a>(text: &'a str, name: &str) -> &'a str {
    let trimmed = text.trim_start();
    trimmed
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix(':'))
        .map_or(text, str::trim_start)
}
