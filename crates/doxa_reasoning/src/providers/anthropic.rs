use crate::api_types::{Message, MessagesRequest, MessagesResponse};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl AnthropicClient {
    /// `base_url` overrides `ANTHROPIC_BASE_URL`, which overrides the public API.
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY").context("ANTHROPIC_API_KEY is not set")?;
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("ANTHROPIC_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.anthropic.com".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(120)).build()?,
            api_key,
            base_url,
            model: model.to_string(),
            retry: RetryConfig::default(),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    #[tracing::instrument(skip(self, system, messages, params), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let request_body = MessagesRequest {
            model: self.model.clone(),
            system: (!system.is_empty()).then(|| system.to_string()),
            messages,
            max_tokens: params.max_tokens,
            temperature: Some(params.temperature),
        };
        tracing::debug!(
            "LLM params: max_tokens={}, temperature={:.2}",
            params.max_tokens,
            params.temperature
        );

        let client = &self.client;
        let api_key = &self.api_key;
        let response = with_retry(&self.retry, "Anthropic", || async {
            client
                .post(&url)
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&request_body)
                .send()
                .await
                .context("Failed to send request to Anthropic")
        })
        .await?;

        let resp_text = response.text().await?;
        tracing::debug!(
            "Anthropic raw response (first 2000 chars): {}",
            resp_text.chars().take(2000).collect::<String>()
        );
        serde_json::from_str(&resp_text).context("Failed to parse Anthropic response")
    }
}
