//! Stance updates: bias-weighted movement of the two ideological axes
//!
//! For each axis independently:
//!   conf_adj  = base · (1 − confirmation · disagree)
//!   rec_adj   = conf_adj · (1 + recency · 0.3)
//!   final     = rec_adj · (1 − change_resistance)
//!   new_axis  = clamp(old + final, −1, 1)

use crate::state::{clamp_axis, Bias, Stance};
use serde::{Deserialize, Serialize};

/// Amplification applied by the recency bias.
pub const RECENCY_BOOST: f64 = 0.3;

/// Final deltas applied to each axis (before clamping of the result).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StanceDelta {
    pub economic: f64,
    pub social: f64,
}

/// Bias-weighted delta for one axis.
pub fn weighted_delta(base_delta: f64, bias: &Bias, disagree_factor: f64) -> f64 {
    let conf_adj = base_delta * (1.0 - bias.confirmation * disagree_factor);
    let rec_adj = conf_adj * (1.0 + bias.recency * RECENCY_BOOST);
    rec_adj * (1.0 - bias.change_resistance)
}

/// Apply the oracle's base deltas to `stance` using the current `bias`.
/// Returns the weighted deltas that were added.
pub fn update_stance(
    stance: &mut Stance,
    bias: &Bias,
    economic_delta: f64,
    social_delta: f64,
    disagree_factor: f64,
) -> StanceDelta {
    let delta = StanceDelta {
        economic: weighted_delta(economic_delta, bias, disagree_factor),
        social: weighted_delta(social_delta, bias, disagree_factor),
    };
    stance.economic_axis = clamp_axis(stance.economic_axis + delta.economic);
    stance.social_axis = clamp_axis(stance.social_axis + delta.social);
    tracing::debug!(
        "Stance updated: economic {:+.4} → {:.4}, social {:+.4} → {:.4}",
        delta.economic,
        stance.economic_axis,
        delta.social,
        stance.social_axis
    );
    delta
}
