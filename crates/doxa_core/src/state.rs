//! Persona State: the evolving "philosophy" of a single persona
//!
//! The state is decomposed into four parts:
//! - `creed`: a short natural-language core belief (1-2 sentences)
//! - `stance`: two ideological axes in [-1, 1]
//! - `bias`: three cognitive-bias scalars in [0, 1]
//! - `hooks`: trigger / taboo keywords that modulate arousal
//!
//! Every bounded scalar is clamped after every mutation. Loaded states are
//! validated instead of repaired.

use crate::error::StateError;
use serde::{Deserialize, Serialize};

pub const STATE_VERSION: &str = "1.0";
pub const DEFAULT_CREED: &str = "まだ何も学習していない";

/// Clamp a stance axis into [-1, 1].
#[inline]
pub fn clamp_axis(v: f64) -> f64 {
    v.clamp(-1.0, 1.0)
}

/// Clamp a bias scalar into [0, 1].
#[inline]
pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Guard against NaN and Infinity leaking into the state.
#[inline]
fn sanitize_f64(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in persona state, resetting to fallback {}", fallback);
        fallback
    }
}

/// Complete persona state ("philosophy").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaState {
    /// Opaque format tag
    #[serde(default = "default_version")]
    pub version: String,

    /// Core belief, rarely mutated
    pub creed: String,

    /// Apparent age; +1 per processed document, reduced only by rejuvenation
    #[serde(default)]
    pub age_in_days: u32,

    pub stance: Stance,
    pub bias: Bias,
    pub hooks: Hooks,
}

fn default_version() -> String {
    STATE_VERSION.to_string()
}

impl Default for PersonaState {
    fn default() -> Self {
        Self {
            version: default_version(),
            creed: DEFAULT_CREED.to_string(),
            age_in_days: 0,
            stance: Stance::default(),
            bias: Bias::default(),
            hooks: Hooks::default(),
        }
    }
}

impl PersonaState {
    /// Clamp every bounded scalar into its domain.
    pub fn normalize(&mut self) {
        self.stance.normalize();
        self.bias.normalize();
    }

    /// Validate a state read from storage. Out-of-range or non-finite values
    /// are reported, never repaired.
    pub fn validate(&self) -> Result<(), StateError> {
        check_range("stance.economic_axis", self.stance.economic_axis, -1.0, 1.0)?;
        check_range("stance.social_axis", self.stance.social_axis, -1.0, 1.0)?;
        check_range("bias.confirmation", self.bias.confirmation, 0.0, 1.0)?;
        check_range("bias.recency", self.bias.recency, 0.0, 1.0)?;
        check_range("bias.change_resistance", self.bias.change_resistance, 0.0, 1.0)?;
        Ok(())
    }

    /// Number of sentences in the creed (boundary: ideographic full stop).
    pub fn creed_sentence_count(&self) -> usize {
        count_sentences(&self.creed)
    }

    /// Describe the persona for LLM context injection.
    pub fn describe_for_context(&self, lang: &str) -> String {
        let economic = self.stance.economic_label(lang);
        let social = self.stance.social_label(lang);
        let tendencies = self.bias.tendencies(lang);
        let none = if lang == "en" { "none" } else { "特になし" };
        let triggers = if self.hooks.triggers.is_empty() {
            none.to_string()
        } else {
            self.hooks.triggers.join(", ")
        };
        let taboos = if self.hooks.taboos.is_empty() {
            none.to_string()
        } else {
            self.hooks.taboos.join(", ")
        };

        match lang {
            "en" => {
                let mut out = format!(
                    "[Core belief]\n{}\n\n[Stance]\n- Economic: {} (value: {})\n- Social: {} (value: {})\n\n[Cognitive tendencies]\n- Confirmation bias: {} (0=weak, 1=strong)\n- Recency bias: {} (0=weak, 1=strong)\n- Change resistance: {} (0=weak, 1=strong)\n",
                    self.creed,
                    economic,
                    self.stance.economic_axis,
                    social,
                    self.stance.social_axis,
                    self.bias.confirmation,
                    self.bias.recency,
                    self.bias.change_resistance,
                );
                if !tendencies.is_empty() {
                    out.push_str(&format!("\nTraits: {}\n", tendencies.join(", ")));
                }
                out.push_str(&format!(
                    "\n[Reactive keywords]\nTriggers: {}\nTaboos: {}\n\n[Age (days of experience)]\n{} days",
                    triggers, taboos, self.age_in_days
                ));
                out
            }
            _ => {
                let mut out = format!(
                    "【基本信念】\n{}\n\n【立場】\n- 経済観: {} (数値: {})\n- 社会観: {} (数値: {})\n\n【認知の傾向】\n- 確証バイアス: {} (0=弱い, 1=強い)\n- 新近性バイアス: {} (0=弱い, 1=強い)\n- 変化抵抗: {} (0=弱い, 1=強い)\n",
                    self.creed,
                    economic,
                    self.stance.economic_axis,
                    social,
                    self.stance.social_axis,
                    self.bias.confirmation,
                    self.bias.recency,
                    self.bias.change_resistance,
                );
                if !tendencies.is_empty() {
                    out.push_str(&format!("\n特徴: {}\n", tendencies.join("、")));
                }
                out.push_str(&format!(
                    "\n【反応しやすいキーワード】\nトリガー: {}\nタブー: {}\n\n【年齢（経験日数）】\n{}日",
                    triggers, taboos, self.age_in_days
                ));
                out
            }
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), StateError> {
    if !value.is_finite() || value < min || value > max {
        return Err(StateError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Count non-empty segments separated by `。`.
pub fn count_sentences(text: &str) -> usize {
    text.split('。').filter(|s| !s.is_empty()).count()
}

// =============================================================================
// Stance
// =============================================================================

/// Two independent ideological axes, each in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stance {
    /// Economic axis: left (-1) to right (+1)
    #[serde(rename = "economic_left_right", alias = "economic_axis")]
    pub economic_axis: f64,

    /// Social axis: conservative (-1) to liberal (+1)
    #[serde(rename = "social_liberal_conservative", alias = "social_axis")]
    pub social_axis: f64,
}

impl Stance {
    pub fn normalize(&mut self) {
        self.economic_axis = clamp_axis(sanitize_f64(self.economic_axis, 0.0));
        self.social_axis = clamp_axis(sanitize_f64(self.social_axis, 0.0));
    }

    fn economic_label(&self, lang: &str) -> &'static str {
        match (lang, self.economic_axis) {
            ("en", v) if v < -0.5 => "left-leaning",
            ("en", v) if v > 0.5 => "right-leaning",
            ("en", _) => "centrist",
            (_, v) if v < -0.5 => "左派的",
            (_, v) if v > 0.5 => "右派的",
            _ => "中道的",
        }
    }

    fn social_label(&self, lang: &str) -> &'static str {
        match (lang, self.social_axis) {
            ("en", v) if v < -0.5 => "conservative",
            ("en", v) if v > 0.5 => "liberal",
            ("en", _) => "centrist",
            (_, v) if v < -0.5 => "保守的",
            (_, v) if v > 0.5 => "リベラル",
            _ => "中道的",
        }
    }
}

// =============================================================================
// Bias
// =============================================================================

/// Three cognitive-bias scalars, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bias {
    /// Weight given to belief-confirming information
    pub confirmation: f64,
    /// Weight given to the most recent experience
    pub recency: f64,
    /// Overall inertia against change
    pub change_resistance: f64,
}

impl Default for Bias {
    fn default() -> Self {
        Self {
            confirmation: 0.3,
            recency: 0.3,
            change_resistance: 0.3,
        }
    }
}

impl Bias {
    pub fn normalize(&mut self) {
        self.confirmation = clamp_unit(sanitize_f64(self.confirmation, 0.3));
        self.recency = clamp_unit(sanitize_f64(self.recency, 0.3));
        self.change_resistance = clamp_unit(sanitize_f64(self.change_resistance, 0.3));
    }

    fn tendencies(&self, lang: &str) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.confirmation > 0.6 {
            out.push(match lang {
                "en" => "favors information that confirms existing beliefs",
                _ => "自分の信念を裏付ける情報を重視する傾向がある",
            });
        }
        if self.recency > 0.6 {
            out.push(match lang {
                "en" => "weighs recent events heavily",
                _ => "最近の出来事を重視する傾向がある",
            });
        }
        if self.change_resistance > 0.6 {
            out.push(match lang {
                "en" => "resists change",
                _ => "変化に抵抗する傾向がある",
            });
        }
        out
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Trigger and taboo keywords. Order is kept for display; duplicates are
/// rejected on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hooks {
    pub triggers: Vec<String>,
    pub taboos: Vec<String>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            triggers: vec!["革新".into(), "変化".into(), "成長".into()],
            taboos: vec!["停滞".into(), "固執".into()],
        }
    }
}

impl Hooks {
    /// Add a trigger keyword. Returns false if it was already present.
    pub fn add_trigger(&mut self, keyword: &str) -> bool {
        insert_unique(&mut self.triggers, keyword)
    }

    /// Add a taboo keyword. Returns false if it was already present.
    pub fn add_taboo(&mut self, keyword: &str) -> bool {
        insert_unique(&mut self.taboos, keyword)
    }

    pub fn is_trigger(&self, keyword: &str) -> bool {
        self.triggers.iter().any(|k| k == keyword)
    }

    pub fn is_taboo(&self, keyword: &str) -> bool {
        self.taboos.iter().any(|k| k == keyword)
    }
}

fn insert_unique(list: &mut Vec<String>, keyword: &str) -> bool {
    let keyword = keyword.trim();
    if keyword.is_empty() || list.iter().any(|k| k == keyword) {
        return false;
    }
    list.push(keyword.to_string());
    true
}
