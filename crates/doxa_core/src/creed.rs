//! Creed evolution: the threshold-gated identity-shift rule
//!
//! Stable → Mutating → Stable, one evaluation per document. A mutation needs
//! all three of: the creed agent asking for it, adjusted arousal at or above
//! the dynamic threshold, and a non-blank replacement. A mutation also
//! rejuvenates the persona: `age ← max(⌊age / 2⌋, 30)`.
//!
//! Independently, an over-long creed is always compressed by the summarizer.

use crate::state::{count_sentences, PersonaState};
use serde::{Deserialize, Serialize};

/// Creed length (in characters) above which the shrink pass runs.
pub const CREED_MAX_CHARS: usize = 200;
/// Sentence count above which the shrink pass runs.
pub const CREED_MAX_SENTENCES: usize = 2;
/// Target length handed to the summarizer.
pub const CREED_SHRINK_TARGET_CHARS: usize = 150;
/// Age floor after rejuvenation.
pub const REJUVENATION_FLOOR_DAYS: u32 = 30;

/// The creed agent's recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreedProposal {
    pub should_update: bool,
    #[serde(default)]
    pub updated_creed: String,
    #[serde(default)]
    pub reason: String,
}

/// Why a proposal did not change the creed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreedRejection {
    NotRequested,
    BelowThreshold,
    EmptyProposal,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreedTransition {
    Mutated { old_age: u32, new_age: u32 },
    Rejected { reason: CreedRejection },
}

impl CreedTransition {
    pub fn is_mutated(&self) -> bool {
        matches!(self, CreedTransition::Mutated { .. })
    }
}

/// `max(⌊age / 2⌋, 30)`.
pub fn rejuvenated_age(age_in_days: u32) -> u32 {
    (age_in_days / 2).max(REJUVENATION_FLOOR_DAYS)
}

/// Evaluate a proposal against the threshold and apply it to `state` when it
/// qualifies. On rejection the state is left untouched.
pub fn evolve_creed(
    state: &mut PersonaState,
    proposal: &CreedProposal,
    adjusted_arousal: f64,
    threshold: f64,
) -> CreedTransition {
    if !proposal.should_update {
        return CreedTransition::Rejected {
            reason: CreedRejection::NotRequested,
        };
    }
    if adjusted_arousal < threshold {
        tracing::debug!(
            "Creed update requested but arousal {:.2} < threshold {:.2}",
            adjusted_arousal,
            threshold
        );
        return CreedTransition::Rejected {
            reason: CreedRejection::BelowThreshold,
        };
    }
    if proposal.updated_creed.trim().is_empty() {
        tracing::info!("Creed update proposed with an empty creed; keeping the current one");
        return CreedTransition::Rejected {
            reason: CreedRejection::EmptyProposal,
        };
    }

    let old_age = state.age_in_days;
    let new_age = rejuvenated_age(old_age);
    state.creed = proposal.updated_creed.clone();
    state.age_in_days = new_age;
    tracing::info!(
        "Creed replaced ({}); persona rejuvenated {} → {} days",
        proposal.reason,
        old_age,
        new_age
    );

    CreedTransition::Mutated { old_age, new_age }
}

/// Whether the creed exceeds the size bounds and must be summarized.
pub fn needs_shrink(creed: &str) -> bool {
    creed.chars().count() > CREED_MAX_CHARS || count_sentences(creed) > CREED_MAX_SENTENCES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(should: bool, creed: &str) -> CreedProposal {
        CreedProposal {
            should_update: should,
            updated_creed: creed.to_string(),
            reason: "test".to_string(),
        }
    }

    fn aged(age: u32) -> PersonaState {
        PersonaState {
            age_in_days: age,
            ..PersonaState::default()
        }
    }

    #[test]
    fn test_mutation_replaces_creed_and_rejuvenates() {
        let mut state = aged(200);
        let t = evolve_creed(&mut state, &proposal(true, "新しい信念。"), 120.0, 100.0);
        assert_eq!(
            t,
            CreedTransition::Mutated {
                old_age: 200,
                new_age: 100
            }
        );
        assert_eq!(state.creed, "新しい信念。");
        assert_eq!(state.age_in_days, 100);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut state = aged(80);
        let t = evolve_creed(&mut state, &proposal(true, "x"), 100.0, 100.0);
        assert!(t.is_mutated());
        assert_eq!(state.age_in_days, 40);
    }

    #[test]
    fn test_rejuvenation_floor() {
        assert_eq!(rejuvenated_age(61), 30);
        assert_eq!(rejuvenated_age(10), 30);
        assert_eq!(rejuvenated_age(1001), 500);
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let original = aged(300);

        let mut state = original.clone();
        let t = evolve_creed(&mut state, &proposal(false, "新しい"), 500.0, 70.0);
        assert_eq!(
            t,
            CreedTransition::Rejected {
                reason: CreedRejection::NotRequested
            }
        );
        assert_eq!(state, original);

        let mut state = original.clone();
        let t = evolve_creed(&mut state, &proposal(true, "新しい"), 99.99, 100.0);
        assert_eq!(
            t,
            CreedTransition::Rejected {
                reason: CreedRejection::BelowThreshold
            }
        );
        assert_eq!(state, original);

        let mut state = original.clone();
        let t = evolve_creed(&mut state, &proposal(true, "  \n "), 500.0, 70.0);
        assert_eq!(
            t,
            CreedTransition::Rejected {
                reason: CreedRejection::EmptyProposal
            }
        );
        assert_eq!(state, original);
    }

    #[test]
    fn test_needs_shrink_by_length() {
        let at_limit: String = "あ".repeat(CREED_MAX_CHARS);
        assert!(!needs_shrink(&at_limit));
        let over: String = "あ".repeat(CREED_MAX_CHARS + 1);
        assert!(needs_shrink(&over));
    }

    #[test]
    fn test_needs_shrink_by_sentences() {
        assert!(!needs_shrink("一つ目。二つ目。"));
        assert!(needs_shrink("一つ目。二つ目。三つ目。"));
    }
}
