//! Bias updates: rule-based drift of the three cognitive-bias scalars
//!
//! - Confirmation entrenches under high-arousal disagreement and loosens
//!   under calm disagreement.
//! - Recency rises with intense experiences and fades with quiet ones.
//! - Change resistance decays slowly outside document processing and hardens
//!   by a fixed step after every processed document.

use crate::state::{clamp_unit, Bias};

/// Learning rate for every bias rule.
pub const LEARNING_RATE: f64 = 0.05;

/// Per-document hardening of change resistance.
pub const DAILY_HARDENING: f64 = 0.001;

const DISAGREE_GATE: f64 = 0.6;
const ENTRENCH_AROUSAL: f64 = 60.0;
const LOOSEN_AROUSAL: f64 = 40.0;
const RECENCY_AROUSAL: f64 = 70.0;

/// Signals driving one bias update.
#[derive(Debug, Clone, Copy)]
pub struct BiasSignal {
    pub adjusted_arousal: f64,
    pub disagree_factor: f64,
    pub evidence_strength: f64,
    /// Present on the document-processing path. When absent, the slow
    /// change-resistance decay applies.
    pub plasticity: Option<f64>,
}

/// Return the updated bias triple. Every component stays in [0, 1].
pub fn update_bias(bias: &Bias, signal: &BiasSignal) -> Bias {
    let mut next = *bias;
    let arousal = signal.adjusted_arousal;

    if signal.disagree_factor >= DISAGREE_GATE {
        if arousal >= ENTRENCH_AROUSAL {
            next.confirmation =
                clamp_unit(next.confirmation + LEARNING_RATE * signal.evidence_strength);
        } else if arousal < LOOSEN_AROUSAL {
            next.confirmation =
                clamp_unit(next.confirmation - LEARNING_RATE * signal.evidence_strength);
        }
    }

    if arousal >= RECENCY_AROUSAL {
        next.recency = clamp_unit(next.recency + LEARNING_RATE * 0.5);
    } else {
        next.recency = clamp_unit(next.recency - LEARNING_RATE * 0.2);
    }

    if signal.plasticity.is_none() {
        next.change_resistance = clamp_unit(next.change_resistance - LEARNING_RATE * 0.1);
    }

    next
}

/// Slow monotonic hardening, applied once per fully processed document.
pub fn harden(bias: &mut Bias) {
    bias.change_resistance = clamp_unit(bias.change_resistance + DAILY_HARDENING);
}
