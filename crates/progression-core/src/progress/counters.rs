//! Per-learner progress counters.
//!
//! Counters are declared by the catalog; the set only ever contains the keys
//! it was built from. Cumulative counters never decrease. Streak counters
//! grow one event at a time and drop straight to zero when the streak breaks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};

pub const LESSONS_COMPLETED: &str = "lessonsCompleted";
pub const STREAK_DAYS: &str = "streakDays";
pub const PERFECT_QUIZZES: &str = "perfectQuizzes";
pub const EXERCISES_SOLVED: &str = "exercisesSolved";
pub const SESSIONS_COMPLETED: &str = "sessionsCompleted";
pub const SOCIAL_HELPS: &str = "socialHelps";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    #[default]
    Cumulative,
    /// May be reset to zero on a break.
    Streak,
}

impl CounterKind {
    pub fn is_resettable(&self) -> bool {
        matches!(self, CounterKind::Streak)
    }
}

/// Catalog declaration of a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDefinition {
    pub key: String,
    #[serde(default)]
    pub kind: CounterKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl CounterDefinition {
    pub fn cumulative(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: CounterKind::Cumulative,
            description: String::new(),
        }
    }

    pub fn streak(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: CounterKind::Streak,
            description: String::new(),
        }
    }
}

/// Counter values for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProgressCounterSet {
    kinds: BTreeMap<String, CounterKind>,
    values: BTreeMap<String, u64>,
}

impl ProgressCounterSet {
    /// All declared counters, starting at zero.
    pub fn from_definitions(definitions: &[CounterDefinition]) -> Self {
        let mut set = Self::default();
        for def in definitions {
            set.kinds.insert(def.key.clone(), def.kind);
            set.values.insert(def.key.clone(), 0);
        }
        set
    }

    pub fn contains(&self, key: &str) -> bool {
        self.kinds.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Result<u64> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| CoreError::UnknownCounter(key.to_string()))
    }

    pub fn kind(&self, key: &str) -> Result<CounterKind> {
        self.kinds
            .get(key)
            .copied()
            .ok_or_else(|| CoreError::UnknownCounter(key.to_string()))
    }

    pub fn values(&self) -> &BTreeMap<String, u64> {
        &self.values
    }

    /// Apply `delta` to a counter and return its new value.
    ///
    /// A negative delta is only accepted for streak counters, where it
    /// breaks the streak and sets the value to zero.
    pub fn record(&mut self, key: &str, delta: i64) -> Result<u64> {
        let kind = self.kind(key)?;
        let value = self
            .values
            .get_mut(key)
            .ok_or_else(|| CoreError::UnknownCounter(key.to_string()))?;

        if delta < 0 {
            if !kind.is_resettable() {
                return Err(CoreError::NegativeDelta {
                    counter: key.to_string(),
                    delta,
                });
            }
            tracing::debug!(counter = key, previous = *value, "streak broken");
            *value = 0;
        } else {
            *value = value.saturating_add(delta.unsigned_abs());
        }
        Ok(*value)
    }

    /// Break a streak counter.
    pub fn reset(&mut self, key: &str) -> Result<()> {
        if !self.kind(key)?.is_resettable() {
            let current = self.get(key)?;
            return Err(CoreError::NegativeDelta {
                counter: key.to_string(),
                delta: -i64::try_from(current).unwrap_or(i64::MAX),
            });
        }
        self.values.insert(key.to_string(), 0);
        Ok(())
    }

    /// Record `delta` only if the catalog declares `key`.
    pub(crate) fn record_if_defined(&mut self, key: &str, delta: u64) -> Option<u64> {
        if delta == 0 || !self.contains(key) {
            return None;
        }
        let delta = i64::try_from(delta).unwrap_or(i64::MAX);
        self.record(key, delta).ok()
    }
}
