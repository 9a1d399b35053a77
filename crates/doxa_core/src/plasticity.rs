//! Plasticity Model: how open a persona still is to change at a given age
//!
//! plasticity(age) = 1.0                                  if age ≤ youth
//!                 = clamp(0.7 · e^{-k(age - maturity)},   otherwise
//!                         minimum, 1.0)
//!
//! which is the youth-relative decay `e^{-k(age - youth)}` rescaled so that it
//! equals exactly 0.7 at the maturity point. The creed mutation threshold is
//! `70 / plasticity`, so it reaches 100 at maturity and keeps rising after.

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Lower bound applied to `minimum_plasticity` so the threshold stays finite.
pub const MIN_PLASTICITY_FLOOR: f64 = 1e-3;

/// Plasticity at the maturity point.
pub const MATURITY_PLASTICITY: f64 = 0.7;

/// Arousal threshold at full plasticity.
pub const BASE_AROUSAL_THRESHOLD: f64 = 70.0;

/// The four numeric parameters of the plasticity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlasticityConfig {
    /// Days of full openness
    pub youth_period_days: u32,
    /// Age at which plasticity equals 0.7
    pub maturity_point_days: u32,
    /// Exponential decay per day after youth
    pub decay_rate: f64,
    /// Floor of the curve
    pub minimum_plasticity: f64,
}

impl Default for PlasticityConfig {
    fn default() -> Self {
        Self {
            youth_period_days: 30,
            maturity_point_days: 365,
            decay_rate: 0.003,
            minimum_plasticity: 0.1,
        }
    }
}

impl PlasticityConfig {
    /// Reject parameters the curve cannot work with. A zero decay rate is
    /// valid (constant 0.7 after youth); a zero minimum is floored later.
    pub fn validate(&self) -> Result<(), StateError> {
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return Err(StateError::InvalidConfig(format!(
                "decay_rate must be a finite non-negative number, got {}",
                self.decay_rate
            )));
        }
        if !self.minimum_plasticity.is_finite()
            || self.minimum_plasticity < 0.0
            || self.minimum_plasticity > 1.0
        {
            return Err(StateError::InvalidConfig(format!(
                "minimum_plasticity must be within [0, 1], got {}",
                self.minimum_plasticity
            )));
        }
        Ok(())
    }

    /// `minimum_plasticity` floored to a strictly positive epsilon.
    pub fn effective_minimum(&self) -> f64 {
        self.minimum_plasticity.max(MIN_PLASTICITY_FLOOR)
    }

    /// Plasticity coefficient in [effective_minimum, 1.0].
    pub fn plasticity(&self, age_in_days: u32) -> f64 {
        if age_in_days <= self.youth_period_days {
            return 1.0;
        }
        let since_maturity = age_in_days as f64 - self.maturity_point_days as f64;
        let raw = MATURITY_PLASTICITY * (-self.decay_rate * since_maturity).exp();
        let floor = self.effective_minimum().min(1.0);
        if raw.is_nan() {
            return floor;
        }
        raw.clamp(floor, 1.0)
    }

    /// Arousal level a creed mutation must reach at this age.
    pub fn threshold(&self, age_in_days: u32) -> f64 {
        dynamic_threshold(self.plasticity(age_in_days))
    }

    pub fn reading(&self, age_in_days: u32) -> PlasticityReading {
        let plasticity = self.plasticity(age_in_days);
        PlasticityReading {
            age_in_days,
            plasticity,
            threshold: dynamic_threshold(plasticity),
        }
    }
}

/// `70 / plasticity`. Callers pass a plasticity already floored above zero.
pub fn dynamic_threshold(plasticity: f64) -> f64 {
    BASE_AROUSAL_THRESHOLD / plasticity.max(MIN_PLASTICITY_FLOOR)
}

/// Plasticity query result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlasticityReading {
    pub age_in_days: u32,
    pub plasticity: f64,
    pub threshold: f64,
}

// =============================================================================
// Persisted document (plasticity_config.json)
// =============================================================================

/// On-disk layout of a persona's plasticity configuration, including the
/// named presets. Unknown per-parameter fields (units, UI bounds) are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlasticityDocument {
    pub plasticity_model: PlasticityModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlasticityModel {
    pub parameters: PlasticityParameters,
    #[serde(default)]
    pub presets: BTreeMap<String, PlasticityPreset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlasticityParameters {
    pub youth_period_days: Parameter<u32>,
    pub maturity_point_days: Parameter<u32>,
    pub decay_rate: Parameter<f64>,
    pub minimum_plasticity: Parameter<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> Parameter<T> {
    fn new(value: T, description: &str) -> Self {
        Self {
            value,
            description: description.to_string(),
            extra: Map::new(),
        }
    }
}

/// A named bundle of curve parameters. The minimum plasticity is not part of
/// a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlasticityPreset {
    pub youth_period_days: u32,
    pub maturity_point_days: u32,
    pub decay_rate: f64,
    #[serde(default)]
    pub description: String,
}

impl PlasticityPreset {
    fn new(youth: u32, maturity: u32, decay: f64, description: &str) -> Self {
        Self {
            youth_period_days: youth,
            maturity_point_days: maturity,
            decay_rate: decay,
            description: description.to_string(),
        }
    }
}

/// Built-in presets shipped with the default configuration.
pub fn builtin_presets() -> BTreeMap<String, PlasticityPreset> {
    let mut presets = BTreeMap::new();
    presets.insert(
        "balanced".to_string(),
        PlasticityPreset::new(30, 365, 0.003, "標準的な成長曲線"),
    );
    presets.insert(
        "flexible".to_string(),
        PlasticityPreset::new(90, 730, 0.001, "長い若年期を持ち、ゆっくり成熟する"),
    );
    presets.insert(
        "stubborn".to_string(),
        PlasticityPreset::new(7, 120, 0.01, "早く成熟し、すぐに頑固になる"),
    );
    presets.insert(
        "eternal_youth".to_string(),
        PlasticityPreset::new(365, 1825, 0.0005, "ほとんど老いない"),
    );
    presets
}

impl Default for PlasticityDocument {
    fn default() -> Self {
        Self::from_config(&PlasticityConfig::default())
    }
}

impl PlasticityDocument {
    /// Build a document with the built-in presets around `config`.
    pub fn from_config(config: &PlasticityConfig) -> Self {
        Self {
            plasticity_model: PlasticityModel {
                parameters: PlasticityParameters {
                    youth_period_days: Parameter::new(
                        config.youth_period_days,
                        "最大可塑性を維持する若年期の日数",
                    ),
                    maturity_point_days: Parameter::new(
                        config.maturity_point_days,
                        "可塑性が0.7（閾値100）になる成熟点の日数",
                    ),
                    decay_rate: Parameter::new(config.decay_rate, "若年期後の1日あたりの減衰率"),
                    minimum_plasticity: Parameter::new(
                        config.minimum_plasticity,
                        "可塑性の下限値",
                    ),
                },
                presets: builtin_presets(),
            },
        }
    }

    pub fn config(&self) -> PlasticityConfig {
        let p = &self.plasticity_model.parameters;
        PlasticityConfig {
            youth_period_days: p.youth_period_days.value,
            maturity_point_days: p.maturity_point_days.value,
            decay_rate: p.decay_rate.value,
            minimum_plasticity: p.minimum_plasticity.value,
        }
    }

    pub fn set_config(&mut self, config: &PlasticityConfig) {
        let p = &mut self.plasticity_model.parameters;
        p.youth_period_days.value = config.youth_period_days;
        p.maturity_point_days.value = config.maturity_point_days;
        p.decay_rate.value = config.decay_rate;
        p.minimum_plasticity.value = config.minimum_plasticity;
    }

    /// Overwrite youth, maturity and decay with a named preset.
    /// Returns false if the preset does not exist.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(preset) = self.plasticity_model.presets.get(name).cloned() else {
            return false;
        };
        let p = &mut self.plasticity_model.parameters;
        p.youth_period_days.value = preset.youth_period_days;
        p.maturity_point_days.value = preset.maturity_point_days;
        p.decay_rate.value = preset.decay_rate;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(youth: u32, maturity: u32, decay: f64, min: f64) -> PlasticityConfig {
        PlasticityConfig {
            youth_period_days: youth,
            maturity_point_days: maturity,
            decay_rate: decay,
            minimum_plasticity: min,
        }
    }

    #[test]
    fn test_full_plasticity_during_youth() {
        let cfg = config(30, 365, 0.01, 0.05);
        for age in 0..=30 {
            assert_eq!(cfg.plasticity(age), 1.0);
            assert_eq!(cfg.threshold(age), 70.0);
        }
    }

    #[test]
    fn test_plasticity_at_maturity_is_point_seven() {
        let cfg = config(30, 365, 0.003, 0.05);
        assert!((cfg.plasticity(365) - 0.7).abs() < 1e-12);
        assert!((cfg.threshold(365) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_enforced_for_old_personas() {
        let cfg = config(30, 365, 0.01, 0.05);
        let computed = 0.7 * (-0.01f64 * (1000.0 - 365.0)).exp();
        assert!(computed < 0.05);
        assert_eq!(cfg.plasticity(1000), 0.05f64.max(computed));
        assert!((cfg.threshold(1000) - 1400.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_decay_is_constant_after_youth() {
        let cfg = config(30, 365, 0.0, 0.05);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.plasticity(31), 0.7);
        assert_eq!(cfg.plasticity(10_000), 0.7);
    }

    #[test]
    fn test_zero_minimum_is_floored() {
        let cfg = config(0, 10, 1.0, 0.0);
        assert!(cfg.validate().is_ok());
        let p = cfg.plasticity(u32::MAX);
        assert_eq!(p, MIN_PLASTICITY_FLOOR);
        assert!(cfg.threshold(u32::MAX).is_finite());
    }

    #[test]
    fn test_early_post_youth_capped_at_one() {
        let cfg = config(30, 365, 0.003, 0.1);
        assert_eq!(cfg.plasticity(31), 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(config(30, 365, -0.1, 0.1).validate().is_err());
        assert!(config(30, 365, f64::NAN, 0.1).validate().is_err());
        assert!(config(30, 365, 0.01, 1.5).validate().is_err());
        assert!(config(30, 365, 0.01, -0.1).validate().is_err());
    }

    #[test]
    fn test_unvalidated_minimum_above_one_caps_at_one() {
        let cfg = config(30, 365, 0.01, 1.5);
        assert_eq!(cfg.plasticity(1000), 1.0);
        assert_eq!(cfg.plasticity(365), 1.0);
        assert_eq!(cfg.threshold(1000), 70.0);
    }

    #[test]
    fn test_document_roundtrip_keeps_extra_fields() {
        let json = r#"{
          "plasticity_model": {
            "parameters": {
              "youth_period_days": {"value": 10, "description": "y", "unit": "days"},
              "maturity_point_days": {"value": 100},
              "decay_rate": {"value": 0.02, "min": 0.0, "max": 0.1},
              "minimum_plasticity": {"value": 0.2}
            },
            "presets": {
              "quick": {"youth_period_days": 1, "maturity_point_days": 20, "decay_rate": 0.05, "description": "q"}
            }
          }
        }"#;
        let doc: PlasticityDocument = serde_json::from_str(json).unwrap();
        let cfg = doc.config();
        assert_eq!(cfg.youth_period_days, 10);
        assert_eq!(cfg.minimum_plasticity, 0.2);
        let out = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            out["plasticity_model"]["parameters"]["youth_period_days"]["unit"],
            "days"
        );
    }

    #[test]
    fn test_apply_preset_keeps_minimum() {
        let mut doc = PlasticityDocument::default();
        doc.plasticity_model.parameters.minimum_plasticity.value = 0.25;
        assert!(doc.apply_preset("stubborn"));
        let cfg = doc.config();
        assert_eq!(cfg.youth_period_days, 7);
        assert_eq!(cfg.maturity_point_days, 120);
        assert_eq!(cfg.decay_rate, 0.01);
        assert_eq!(cfg.minimum_plasticity, 0.25);
        assert!(!doc.apply_preset("nonexistent"));
    }
}
