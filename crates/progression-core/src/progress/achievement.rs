//! Achievement catalog types and the per-learner evaluation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use super::counters::ProgressCounterSet;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Learning,
    Social,
    Streak,
    Mastery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub category: AchievementCategory,
    pub tier: AchievementTier,
    pub points: u32,
    #[serde(alias = "counterKey")]
    pub counter_key: String,
    pub requirement: u64,
}

/// Per-learner view of one definition.
///
/// Once `unlocked` is set it stays set, and `progress` is held at or above
/// the requirement even if a streak counter later breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementState {
    pub definition_id: String,
    pub progress: u64,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Emitted once per definition, at the evaluation that unlocks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlocked {
    pub definition_id: String,
    pub points: u32,
    pub at: DateTime<Utc>,
}

/// The "closest to unlocking" recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementTarget {
    pub definition_id: String,
    pub tier: AchievementTier,
    pub progress: u64,
    pub requirement: u64,
}

impl AchievementTarget {
    pub fn percent(&self) -> u8 {
        let pct = self.progress.saturating_mul(100) / self.requirement.max(1);
        pct.min(100) as u8
    }
}

/// Owns a learner's counters and achievement states.
#[derive(Debug, Clone)]
pub struct AchievementEngine {
    definitions: Arc<[AchievementDefinition]>,
    counters: ProgressCounterSet,
    states: Vec<AchievementState>,
}

impl AchievementEngine {
    /// Every definition must reference a counter present in `counters`.
    pub fn new(
        definitions: Arc<[AchievementDefinition]>,
        counters: ProgressCounterSet,
    ) -> Result<Self> {
        if let Some(def) = definitions
            .iter()
            .find(|def| !counters.contains(&def.counter_key))
        {
            return Err(CoreError::UnknownCounter(def.counter_key.clone()));
        }
        let states = definitions
            .iter()
            .map(|def| AchievementState {
                definition_id: def.id.clone(),
                progress: 0,
                unlocked: false,
                unlocked_at: None,
            })
            .collect();
        Ok(Self {
            definitions,
            counters,
            states,
        })
    }

    pub fn counters(&self) -> &ProgressCounterSet {
        &self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut ProgressCounterSet {
        &mut self.counters
    }

    pub fn states(&self) -> &[AchievementState] {
        &self.states
    }

    pub fn state_of(&self, definition_id: &str) -> Option<&AchievementState> {
        self.states.iter().find(|s| s.definition_id == definition_id)
    }

    pub fn total_points(&self) -> u64 {
        self.definitions
            .iter()
            .zip(&self.states)
            .filter(|(_, state)| state.unlocked)
            .map(|(def, _)| u64::from(def.points))
            .sum()
    }

    pub fn record_event(&mut self, counter_key: &str, delta: i64) -> Result<u64> {
        self.counters.record(counter_key, delta)
    }

    /// Refresh progress from the counters and unlock every definition that
    /// has reached its requirement. Idempotent.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Result<Vec<AchievementUnlocked>> {
        let mut unlocked = Vec::new();
        for (def, state) in self.definitions.iter().zip(self.states.iter_mut()) {
            let value = self.counters.get(&def.counter_key)?;
            if state.unlocked {
                state.progress = value.max(def.requirement);
                continue;
            }
            state.progress = value;
            if value >= def.requirement {
                state.unlocked = true;
                state.unlocked_at = Some(now);
                tracing::info!(
                    achievement = %def.id,
                    points = def.points,
                    "achievement unlocked"
                );
                unlocked.push(AchievementUnlocked {
                    definition_id: def.id.clone(),
                    points: def.points,
                    at: now,
                });
            }
        }
        Ok(unlocked)
    }

    /// The locked achievement with the highest progress/requirement ratio.
    ///
    /// Ties go to the lower requirement, then to catalog order.
    pub fn next_target(&self) -> Option<AchievementTarget> {
        let mut best: Option<AchievementTarget> = None;
        for (def, state) in self.definitions.iter().zip(&self.states) {
            if state.unlocked {
                continue;
            }
            let candidate = AchievementTarget {
                definition_id: def.id.clone(),
                tier: def.tier,
                progress: self.counters.get(&def.counter_key).unwrap_or(0),
                requirement: def.requirement,
            };
            let replace = match &best {
                None => true,
                Some(current) => compare_targets(&candidate, current) == Ordering::Greater,
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }
}

/// `Greater` means `a` is the better recommendation.
fn compare_targets(a: &AchievementTarget, b: &AchievementTarget) -> Ordering {
    let lhs = u128::from(a.progress) * u128::from(b.requirement);
    let rhs = u128::from(b.progress) * u128::from(a.requirement);
    lhs.cmp(&rhs)
        .then_with(|| b.requirement.cmp(&a.requirement))
}
