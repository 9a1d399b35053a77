use crate::api_types::{Message, MessagesResponse};
use anyhow::Result;
use async_trait::async_trait;

/// Parameters for one completion request
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits)
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

impl From<&doxa_core::config::LlmConfig> for CompletionParams {
    fn from(cfg: &doxa_core::config::LlmConfig) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request and return the model's reply.
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse>;
}

// Providers available in crate::providers
