//! LLM provider trait

use async_trait::async_trait;

use crate::error::Result;

/// A single-turn chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub user: String,
    pub temperature: f32,
}

/// Trait for chat-style language models
///
/// Implementations:
/// - `OpenAiClient`: OpenAI-compatible `/chat/completions`
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Return the assistant message text
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
