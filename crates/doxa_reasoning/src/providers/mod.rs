pub mod anthropic;
pub mod mock;
pub mod openai;

use crate::llm::LlmClient;
use anyhow::Result;
use doxa_core::config::LlmConfig;
use std::sync::Arc;

/// Build the client named by `config.provider`.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openai" => Arc::new(openai::OpenAiClient::new(&config.model, config.base_url.as_deref())?),
        "anthropic" => Arc::new(anthropic::AnthropicClient::new(&config.model, config.base_url.as_deref())?),
        "mock" => Arc::new(mock::MockProvider::new(&config.model)),
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    };
    tracing::info!("Using {} provider with model {}", config.provider, config.model);
    Ok(client)
}
