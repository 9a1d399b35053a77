use crate::api_types::{Message, MessagesResponse, Role};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

/// Any OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    /// `base_url` overrides `OPENAI_BASE_URL`, which overrides the public API.
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
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

    fn build_payload(&self, system: &str, messages: &[Message], params: &CompletionParams) -> Value {
        // OpenAI puts the system prompt first with role "system"
        let mut openai_messages = vec![json!({"role": "system", "content": system})];
        for msg in messages {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            openai_messages.push(json!({"role": role, "content": msg.text()}));
        }
        json!({
            "model": self.model,
            "messages": openai_messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    #[tracing::instrument(skip(self, system, messages, params), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let payload = self.build_payload(system, &messages, &params);
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(
            "LLM params: max_tokens={}, temperature={:.2}",
            params.max_tokens,
            params.temperature
        );

        let client = &self.client;
        let api_key = &self.api_key;
        let response = with_retry(&self.retry, "OpenAI", || async {
            client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&payload)
                .send()
                .await
                .context("Failed to send request to OpenAI")
        })
        .await?;

        let resp_json: Value = response.json().await.context("Failed to parse OpenAI response")?;
        parse_chat_completion(&resp_json)
    }
}

fn parse_chat_completion(resp_json: &Value) -> Result<MessagesResponse> {
    let choice = &resp_json["choices"][0];
    let content = choice["message"]["content"]
        .as_str()
        .context("OpenAI response has no message content")?;
    let finish_reason = choice["finish_reason"].as_str().unwrap_or("stop");
    Ok(MessagesResponse::from_text(content, finish_reason))
}
