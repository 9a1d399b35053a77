//! Generation diff: what changed between two snapshots of a persona.

use crate::state::{Bias, PersonaState};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDiff {
    pub economic_before: f64,
    pub economic_after: f64,
    pub social_before: f64,
    pub social_after: f64,
    /// Present only if any bias component changed
    pub bias: Option<(Bias, Bias)>,
    /// Present only if the creed changed
    pub creed: Option<(String, String)>,
    pub age_before: u32,
    pub age_after: u32,
    pub new_triggers: Vec<String>,
    pub new_taboos: Vec<String>,
}

impl StateDiff {
    pub fn between(previous: &PersonaState, current: &PersonaState) -> Self {
        let added = |now: &[String], before: &[String]| {
            now.iter()
                .filter(|k| !before.contains(k))
                .cloned()
                .collect::<Vec<_>>()
        };
        Self {
            economic_before: previous.stance.economic_axis,
            economic_after: current.stance.economic_axis,
            social_before: previous.stance.social_axis,
            social_after: current.stance.social_axis,
            bias: (previous.bias != current.bias).then(|| (previous.bias, current.bias)),
            creed: (previous.creed != current.creed)
                .then(|| (previous.creed.clone(), current.creed.clone())),
            age_before: previous.age_in_days,
            age_after: current.age_in_days,
            new_triggers: added(&current.hooks.triggers, &previous.hooks.triggers),
            new_taboos: added(&current.hooks.taboos, &previous.hooks.taboos),
        }
    }

    pub fn economic_delta(&self) -> f64 {
        self.economic_after - self.economic_before
    }

    pub fn social_delta(&self) -> f64 {
        self.social_after - self.social_before
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(50).collect();
    if text.chars().count() > 50 {
        out.push('…');
    }
    out
}

impl fmt::Display for StateDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "economic: {:.3} → {:.3} ({:+.3})",
            self.economic_before,
            self.economic_after,
            self.economic_delta()
        )?;
        writeln!(
            f,
            "social:   {:.3} → {:.3} ({:+.3})",
            self.social_before,
            self.social_after,
            self.social_delta()
        )?;
        writeln!(f, "age:      {} → {} days", self.age_before, self.age_after)?;
        if let Some((before, after)) = &self.bias {
            writeln!(f, "bias:")?;
            writeln!(
                f,
                "  confirmation:      {:.3} → {:.3}",
                before.confirmation, after.confirmation
            )?;
            writeln!(f, "  recency:           {:.3} → {:.3}", before.recency, after.recency)?;
            writeln!(
                f,
                "  change_resistance: {:.3} → {:.3}",
                before.change_resistance, after.change_resistance
            )?;
        }
        if let Some((before, after)) = &self.creed {
            writeln!(f, "creed updated:")?;
            writeln!(f, "  before: {}", preview(before))?;
            writeln!(f, "  after:  {}", preview(after))?;
        }
        if !self.new_triggers.is_empty() {
            writeln!(f, "new triggers: {}", self.new_triggers.join(", "))?;
        }
        if !self.new_taboos.is_empty() {
            writeln!(f, "new taboos: {}", self.new_taboos.join(", "))?;
        }
        Ok(())
    }
}
