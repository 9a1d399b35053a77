use crate::api_types::Message;
use crate::llm::{CompletionParams, LlmClient};
use crate::oracle::{CreedContext, CreedSummary, Impression, Oracle, OracleAnswer, WorldExperience};
use crate::parsing::parse_json_reply;
use crate::prompts::{self, Prompt};
use anyhow::{Context, Result};
use async_trait::async_trait;
use doxa_core::{CreedProposal, HookHits, PersonaState};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// [`Oracle`] backed by a chat-completion client. Each judgment is one
/// request whose reply must be a single JSON object.
pub struct LlmOracle {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
    language: String,
}

impl LlmOracle {
    pub fn new(client: Arc<dyn LlmClient>, params: CompletionParams, language: impl Into<String>) -> Self {
        Self {
            client,
            params,
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    async fn ask_json<T: DeserializeOwned>(&self, step: &str, prompt: Prompt) -> Result<T> {
        tracing::debug!("Oracle step '{}' ({} chars of prompt)", step, prompt.user.len());
        let response = self
            .client
            .complete(&prompt.system, vec![Message::user(prompt.user)], self.params.clone())
            .await
            .with_context(|| format!("oracle step '{}' failed", step))?;
        parse_json_reply(&response.text()).with_context(|| format!("oracle step '{}' returned bad JSON", step))
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn impression(&self, state: &PersonaState, document: &str, hits: HookHits) -> Result<Impression> {
        let prompt = prompts::impression(state, document, hits, &self.language);
        self.ask_json("impression", prompt).await
    }

    async fn experience(
        &self,
        state: &PersonaState,
        document: &str,
        impression: &Impression,
    ) -> Result<WorldExperience> {
        let prompt = prompts::experience(state, document, impression, &self.language);
        self.ask_json("experience", prompt).await
    }

    async fn creed_update(&self, context: CreedContext<'_>) -> Result<CreedProposal> {
        let prompt = prompts::creed_update(&context, &self.language);
        self.ask_json("creed_update", prompt).await
    }

    async fn shrink(&self, creed: &str) -> Result<CreedSummary> {
        let prompt = prompts::shrink(creed, &self.language);
        self.ask_json("shrink", prompt).await
    }

    async fn answer(&self, state: &PersonaState, question: &str) -> Result<OracleAnswer> {
        let prompt = prompts::answer(state, question, &self.language);
        self.ask_json("answer", prompt).await
    }
}
