//! Mock LLM provider: deterministic replies for tests and offline runs.
//!
//! Scripted replies are returned in order. Once the script is exhausted the
//! provider answers with a neutral JSON object carrying every field any
//! judgment asks for, so a full document run works without an API key.

use crate::api_types::{Message, MessagesResponse};
use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug)]
pub struct MockProvider {
    model: String,
    script: Mutex<VecDeque<Result<String, String>>>,
    /// Every (system, user text) pair received, oldest first
    calls: Mutex<Vec<(String, String)>>,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue replies returned before falling back to the neutral reply.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for reply in replies {
            self.push_reply(reply);
        }
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.script).push_back(Ok(reply.into()));
    }

    /// Queue a failing call.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.script).push_back(Err(message.into()));
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }

    fn neutral_reply(&self) -> String {
        json!({
            "impression": format!("({} mock) 特に強い印象はない", self.model),
            "thoughts": "",
            "description": "",
            "fix_arousal": 30,
            "economic_delta": 0.0,
            "social_delta": 0.0,
            "disagree_factor": 0.0,
            "evidence_strength": 0.0,
            "should_update": false,
            "updated_creed": "",
            "reason": "mock",
            "summary": format!("({} mock) 信念の要約", self.model),
            "answer": format!("({} mock) 質問を受け取りました。", self.model),
            "thought_process": "",
            "emotional_tone": "neutral",
            "confidence": 0.5
        })
        .to_string()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        _params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let user_text = messages.iter().map(Message::text).collect::<Vec<_>>().join("\n");
        lock(&self.calls).push((system.to_string(), user_text));

        let next = lock(&self.script).pop_front();
        match next {
            Some(Ok(text)) => Ok(MessagesResponse::from_text(text, "end_turn")),
            Some(Err(message)) => anyhow::bail!("mock provider error: {}", message),
            None => Ok(MessagesResponse::from_text(self.neutral_reply(), "end_turn")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_neutral() {
        let provider = MockProvider::new("test-model").with_replies(["first"]);
        provider.push_error("boom");

        let resp = provider
            .complete("sys", vec![Message::user("q1")], CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(resp.text(), "first");

        let err = provider
            .complete("sys", vec![Message::user("q2")], CompletionParams::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));

        let resp = provider
            .complete("sys", vec![Message::user("q3")], CompletionParams::default())
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&resp.text()).unwrap();
        assert_eq!(v["emotional_tone"], "neutral");
        assert!(v["answer"].as_str().unwrap().contains("test-model"));

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].1, "q3");
    }
}
