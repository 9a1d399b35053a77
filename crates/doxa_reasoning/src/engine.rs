//! PersonaEngine: the per-persona document and question pipeline
//!
//! One engine value per persona key. Every mutating operation holds the
//! persona's lock from the first read to the final rotation, so documents for
//! one persona are processed strictly one after another while different
//! personas proceed concurrently. A failed step returns before anything is
//! saved.

use crate::oracle::{CreedContext, EmotionalTone, Impression, Oracle, WorldExperience};
use anyhow::{Context, Result};
use doxa_core::bias::{harden, update_bias, BiasSignal};
use doxa_core::creed::{evolve_creed, needs_shrink};
use doxa_core::experience::{adjusted_arousal, detect_hooks};
use doxa_core::stance::update_stance;
use doxa_core::{
    CreedTransition, HookHits, PersonaState, PlasticityConfig, PlasticityReading, Stance, StanceDelta,
    StateDiff,
};
use doxa_memory::{GenerationStatus, GenerationStore, Storage};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_ARCHIVE_RETENTION_DAYS: u64 = 30;

/// Prepended to an answer when the question contains a trigger keyword.
pub const TRIGGER_PREFIX: &str = "（強い関心を示しながら）";
/// Prepended when the question contains a taboo keyword and no trigger.
pub const TABOO_PREFIX: &str = "（やや不快感を示しながら）";

/// Everything one processed document produced.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub persona: String,
    /// Manifest revision written by this document
    pub revision: u64,
    pub hits: HookHits,
    pub impression: Impression,
    pub experience: WorldExperience,
    pub adjusted_arousal: f64,
    /// Plasticity and threshold at the incremented age
    pub plasticity: PlasticityReading,
    pub stance_delta: StanceDelta,
    pub creed: CreedTransition,
    pub creed_reason: String,
    pub shrunk: bool,
    pub state: PersonaState,
}

/// An in-character answer with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub thought_process: String,
    pub emotional_tone: EmotionalTone,
    pub confidence: f64,
    pub trigger_detected: bool,
    pub taboo_detected: bool,
    pub persona: String,
    pub creed: String,
    pub stance: Stance,
    pub age_in_days: u32,
}

pub struct PersonaEngine {
    persona: String,
    oracle: Arc<dyn Oracle>,
    storage: Storage,
    generations: GenerationStore,
    archive_retention_days: u64,
}

impl PersonaEngine {
    /// Fails on an invalid persona name.
    pub fn new(persona: &str, oracle: Arc<dyn Oracle>, storage: Storage) -> Result<Self> {
        let generations = storage.generations(persona)?;
        Ok(Self {
            persona: persona.to_string(),
            oracle,
            storage,
            generations,
            archive_retention_days: DEFAULT_ARCHIVE_RETENTION_DAYS,
        })
    }

    pub fn with_archive_retention(mut self, days: u64) -> Self {
        self.archive_retention_days = days;
        self
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn generations(&self) -> &GenerationStore {
        &self.generations
    }

    /// Current state, or the default state for a fresh persona.
    pub fn state(&self) -> Result<PersonaState> {
        self.generations
            .load_or_default()
            .with_context(|| format!("failed to load state of persona '{}'", self.persona))
    }

    pub fn plasticity_config(&self) -> Result<PlasticityConfig> {
        self.storage
            .plasticity()
            .load_config(&self.persona)
            .with_context(|| format!("failed to load plasticity config of persona '{}'", self.persona))
    }

    /// Plasticity and threshold at `age`, or at the persona's current age.
    pub fn plasticity(&self, age: Option<u32>) -> Result<PlasticityReading> {
        let config = self.plasticity_config()?;
        let age = match age {
            Some(age) => age,
            None => self.state()?.age_in_days,
        };
        Ok(config.reading(age))
    }

    /// Read, digest and persist one document.
    pub async fn process_document(&self, document: &str) -> Result<DocumentOutcome> {
        let _guard = self.storage.locks().acquire(&self.persona).await;

        let config = self.plasticity_config()?;
        let mut state = self.state()?;

        state.age_in_days = state.age_in_days.saturating_add(1);
        let reading = config.reading(state.age_in_days);
        tracing::debug!(
            "Persona '{}' at age {}: plasticity {:.4}, threshold {:.2}",
            self.persona,
            reading.age_in_days,
            reading.plasticity,
            reading.threshold
        );

        let hits = HookHits::count(document, &state.hooks);
        let impression = self
            .oracle
            .impression(&state, document, hits)
            .await
            .context("impression step failed")?;
        let experience = self
            .oracle
            .experience(&state, document, &impression)
            .await
            .context("experience step failed")?
            .sanitized()?;

        let arousal = adjusted_arousal(experience.fix_arousal, hits);
        tracing::debug!(
            "Arousal {:.1} adjusted to {:.1} ({} trigger / {} taboo hits)",
            experience.fix_arousal,
            arousal,
            hits.trigger_hits,
            hits.taboo_hits
        );

        // Stance is weighted by the bias as it was before this document
        let bias_before = state.bias;
        let stance_delta = update_stance(
            &mut state.stance,
            &bias_before,
            experience.economic_delta,
            experience.social_delta,
            experience.disagree_factor,
        );
        state.bias = update_bias(
            &bias_before,
            &BiasSignal {
                adjusted_arousal: arousal,
                disagree_factor: experience.disagree_factor,
                evidence_strength: experience.evidence_strength,
                plasticity: Some(reading.plasticity),
            },
        );
        harden(&mut state.bias);

        let proposal = self
            .oracle
            .creed_update(CreedContext {
                state: &state,
                stance_delta,
                impression: &impression,
                experience: &experience,
                adjusted_arousal: arousal,
                threshold: reading.threshold,
            })
            .await
            .context("creed update step failed")?;
        let creed = evolve_creed(&mut state, &proposal, arousal, reading.threshold);
        if let CreedTransition::Mutated { old_age, new_age } = creed {
            tracing::debug!(
                "Creed of '{}' mutated (arousal {:.1} >= {:.1}), age {} -> {}",
                self.persona,
                arousal,
                reading.threshold,
                old_age,
                new_age
            );
        }

        let shrunk = if needs_shrink(&state.creed) {
            self.shrink_creed(&mut state).await?
        } else {
            false
        };

        state.normalize();
        let revision = self
            .generations
            .save(&state)
            .with_context(|| format!("failed to save persona '{}'", self.persona))?;

        if let Err(e) = self.generations.cleanup_archive(self.archive_retention_days) {
            tracing::warn!("Archive cleanup for '{}' failed: {}", self.persona, e);
        }

        Ok(DocumentOutcome {
            persona: self.persona.clone(),
            revision,
            hits,
            impression,
            experience,
            adjusted_arousal: arousal,
            plasticity: reading,
            stance_delta,
            creed,
            creed_reason: proposal.reason,
            shrunk,
            state,
        })
    }

    async fn shrink_creed(&self, state: &mut PersonaState) -> Result<bool> {
        let summary = self
            .oracle
            .shrink(&state.creed)
            .await
            .context("creed shrink step failed")?
            .summary;
        let summary = summary.trim();
        if summary.is_empty() {
            tracing::warn!("Shrink of '{}' returned an empty summary", self.persona);
        }
        tracing::info!(
            "Creed of '{}' shrunk from {} to {} chars",
            self.persona,
            state.creed.chars().count(),
            summary.chars().count()
        );
        state.creed = summary.to_string();
        Ok(true)
    }

    /// Answer a question in character. Never mutates the persona.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let state = self.state()?;
        let reply = self
            .oracle
            .answer(&state, question)
            .await
            .context("answer step failed")?;

        let detection = detect_hooks(question, &state.hooks);
        let answer = if detection.trigger_detected {
            format!("{}{}", TRIGGER_PREFIX, reply.answer)
        } else if detection.taboo_detected {
            format!("{}{}", TABOO_PREFIX, reply.answer)
        } else {
            reply.answer
        };

        Ok(Answer {
            answer,
            thought_process: reply.thought_process,
            emotional_tone: reply.emotional_tone,
            confidence: if reply.confidence.is_finite() {
                reply.confidence.clamp(0.0, 1.0)
            } else {
                0.5
            },
            trigger_detected: detection.trigger_detected,
            taboo_detected: detection.taboo_detected,
            persona: self.persona.clone(),
            creed: state.creed,
            stance: state.stance,
            age_in_days: state.age_in_days,
        })
    }

    /// Rotate a caller-supplied state in as the current generation.
    pub async fn save_state(&self, state: &PersonaState) -> Result<u64> {
        let _guard = self.storage.locks().acquire(&self.persona).await;
        let revision = self
            .generations
            .save(state)
            .with_context(|| format!("failed to save persona '{}'", self.persona))?;
        Ok(revision)
    }

    /// See [`GenerationStore::rollback`].
    pub async fn rollback(&self, generations: u32) -> Result<bool> {
        let _guard = self.storage.locks().acquire(&self.persona).await;
        Ok(self.generations.rollback(generations)?)
    }

    pub async fn cleanup_archive(&self, days_to_keep: u64) -> Result<usize> {
        let _guard = self.storage.locks().acquire(&self.persona).await;
        Ok(self.generations.cleanup_archive(days_to_keep)?)
    }

    /// Difference between the previous and the current generation.
    pub fn diff(&self) -> Result<Option<StateDiff>> {
        Ok(self.generations.diff()?)
    }

    pub fn status(&self) -> Result<GenerationStatus> {
        Ok(self.generations.status()?)
    }
}
