//! Experience integration: keyword hits and arousal adjustment
//!
//! Trigger keywords amplify the felt intensity of a document, taboo keywords
//! dampen it. The adjusted arousal is deliberately left unclamped: it only
//! feeds threshold comparisons, never display.

use crate::state::Hooks;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// Arousal added per trigger hit and removed per taboo hit.
pub const HOOK_AROUSAL_WEIGHT: f64 = 10.0;

/// Keyword hit counts for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookHits {
    pub trigger_hits: u32,
    pub taboo_hits: u32,
}

impl HookHits {
    pub fn count(text: &str, hooks: &Hooks) -> Self {
        Self {
            trigger_hits: count_hits(text, &hooks.triggers),
            taboo_hits: count_hits(text, &hooks.taboos),
        }
    }
}

/// Count case-insensitive occurrences of every keyword in `text`, summed
/// across keywords. Each keyword is matched literally; occurrences of one
/// keyword do not overlap, but matches of different keywords may.
pub fn count_hits(text: &str, keywords: &[String]) -> u32 {
    let mut total = 0u32;
    for keyword in keywords {
        if keyword.is_empty() {
            continue;
        }
        let re = match RegexBuilder::new(&regex::escape(keyword))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!("Skipping keyword {:?}: {}", keyword, e);
                continue;
            }
        };
        let hits = re.find_iter(text).count() as u32;
        total = total.saturating_add(hits);
    }
    total
}

/// `fix_arousal + 10·trigger_hits − 10·taboo_hits`, unclamped.
pub fn adjusted_arousal(fix_arousal: f64, hits: HookHits) -> f64 {
    fix_arousal + HOOK_AROUSAL_WEIGHT * hits.trigger_hits as f64
        - HOOK_AROUSAL_WEIGHT * hits.taboo_hits as f64
}

/// Which hook families appear in a free-text question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDetection {
    pub trigger_detected: bool,
    pub taboo_detected: bool,
}

/// Case-insensitive substring detection of any trigger and any taboo.
pub fn detect_hooks(text: &str, hooks: &Hooks) -> HookDetection {
    let lowered = text.to_lowercase();
    let contains_any = |keywords: &[String]| {
        keywords
            .iter()
            .filter(|k| !k.is_empty())
            .any(|k| lowered.contains(&k.to_lowercase()))
    };
    HookDetection {
        trigger_detected: contains_any(&hooks.triggers),
        taboo_detected: contains_any(&hooks.taboos),
    }
}
