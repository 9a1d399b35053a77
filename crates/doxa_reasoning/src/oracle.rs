//! Oracle: the external judgment collaborator
//!
//! The engine never talks to a language model directly. Every qualitative
//! judgment (how a document felt, how far it moved the persona, whether the
//! creed should change, how to compress it, how to answer a question) goes
//! through this trait and comes back as a typed, range-checked value.

use anyhow::Result;
use async_trait::async_trait;
use doxa_core::{CreedProposal, HookHits, PersonaState, StanceDelta};
use serde::{Deserialize, Deserializer, Serialize};

/// First reaction after reading a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impression {
    /// Felt sense after reading, hard to put into words
    pub impression: String,
    #[serde(default)]
    pub thoughts: String,
}

/// Subjective experience of "entering" the document's world, with the
/// numeric signals that drive the state update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldExperience {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impression: String,
    /// Emotional intensity in [0, 100]
    pub fix_arousal: f64,
    /// Base economic-axis delta in [-1, 1]
    pub economic_delta: f64,
    /// Base social-axis delta in [-1, 1]
    pub social_delta: f64,
    /// Disagreement with the current stance in [0, 1]
    pub disagree_factor: f64,
    /// Strength of the presented evidence in [0, 1]
    pub evidence_strength: f64,
}

impl WorldExperience {
    /// Clamp every numeric field into its contract range, warning on each
    /// correction. Non-finite values are rejected.
    pub fn sanitized(mut self) -> Result<Self> {
        let fields: [(&str, &mut f64, f64, f64); 5] = [
            ("fix_arousal", &mut self.fix_arousal, 0.0, 100.0),
            ("economic_delta", &mut self.economic_delta, -1.0, 1.0),
            ("social_delta", &mut self.social_delta, -1.0, 1.0),
            ("disagree_factor", &mut self.disagree_factor, 0.0, 1.0),
            ("evidence_strength", &mut self.evidence_strength, 0.0, 1.0),
        ];
        for (name, value, min, max) in fields {
            if !value.is_finite() {
                anyhow::bail!("oracle returned non-finite {}: {}", name, value);
            }
            if *value < min || *value > max {
                let clamped = value.clamp(min, max);
                tracing::warn!(
                    "Oracle {} = {} outside [{}, {}], clamped to {}",
                    name,
                    value,
                    min,
                    max,
                    clamped
                );
                *value = clamped;
            }
        }
        Ok(self)
    }
}

/// Everything the creed agent sees when deciding on an update.
#[derive(Debug, Clone, Copy)]
pub struct CreedContext<'a> {
    /// State after the stance and bias updates
    pub state: &'a PersonaState,
    pub stance_delta: StanceDelta,
    pub impression: &'a Impression,
    pub experience: &'a WorldExperience,
    pub adjusted_arousal: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreedSummary {
    pub summary: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalTone {
    Positive,
    #[default]
    Neutral,
    Negative,
    Passionate,
    Defensive,
}

impl EmotionalTone {
    /// Unknown labels map to `Neutral`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            "passionate" => Self::Passionate,
            "defensive" => Self::Defensive,
            _ => Self::Neutral,
        }
    }
}

fn lenient_tone<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EmotionalTone, D::Error> {
    let label = String::deserialize(deserializer)?;
    Ok(EmotionalTone::parse(&label))
}

fn default_confidence() -> f64 {
    0.5
}

/// In-character answer to a direct question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleAnswer {
    pub answer: String,
    #[serde(default)]
    pub thought_process: String,
    #[serde(default, deserialize_with = "lenient_tone")]
    pub emotional_tone: EmotionalTone,
    /// In [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn impression(&self, state: &PersonaState, document: &str, hits: HookHits) -> Result<Impression>;

    async fn experience(
        &self,
        state: &PersonaState,
        document: &str,
        impression: &Impression,
    ) -> Result<WorldExperience>;

    async fn creed_update(&self, context: CreedContext<'_>) -> Result<CreedProposal>;

    /// Compress an over-long creed.
    async fn shrink(&self, creed: &str) -> Result<CreedSummary>;

    async fn answer(&self, state: &PersonaState, question: &str) -> Result<OracleAnswer>;
}
