//! LLM collaborator port and implementations
//!
//! The engine never retries a failed call; it converts the error into a
//! deterministic fallback at the call site.

mod openai;
mod stub;

pub use openai::{OpenAiClient, DEFAULT_BASE_URL};
pub use stub::{StubLlm, STUB_EMBEDDING_DIM};

use async_trait::async_trait;

use delver_domain::{GameError, GameResult};

/// A chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_context: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>, user_context: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_context: user_context.into(),
            max_tokens: 512,
            temperature: 0.8,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A chat completion response
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub finish_reason: String,
}

/// Port for the external LLM collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn chat_completion(&self, request: ChatRequest) -> GameResult<ChatResponse>;
    async fn create_embedding(&self, text: &str, model: &str) -> GameResult<Vec<f64>>;
}

/// Map any transport-level failure to the structured error callers fall back on
pub(crate) fn transport_error(detail: impl std::fmt::Display) -> GameError {
    tracing::warn!(%detail, "LLM transport failure");
    GameError::ExternalUnavailable("llm")
}
