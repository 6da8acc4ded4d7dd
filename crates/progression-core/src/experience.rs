//! Experience points and level.

use serde::{Deserialize, Serialize};

pub const DEFAULT_XP_PER_LEVEL: u64 = 100;

/// Linear level curve: every `xp_per_level` points is one level, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    xp: u64,
    xp_per_level: u64,
}

/// Serializable view handed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStatus {
    pub xp: u64,
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_for_next_level: u64,
}

impl Experience {
    pub fn new(xp_per_level: u64) -> Self {
        Self {
            xp: 0,
            xp_per_level: xp_per_level.max(1),
        }
    }

    pub fn with_xp(xp: u64, xp_per_level: u64) -> Self {
        Self {
            xp,
            ..Self::new(xp_per_level)
        }
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    pub fn level(&self) -> u32 {
        let level = 1 + self.xp / self.xp_per_level;
        u32::try_from(level).unwrap_or(u32::MAX)
    }

    pub fn status(&self) -> LevelStatus {
        let into = self.xp % self.xp_per_level;
        LevelStatus {
            xp: self.xp,
            level: self.level(),
            xp_into_level: into,
            xp_for_next_level: self.xp_per_level - into,
        }
    }

    /// Add XP. Returns the new level when it changed.
    pub fn credit(&mut self, amount: u64) -> Option<u32> {
        let before = self.level();
        self.xp = self.xp.saturating_add(amount);
        let after = self.level();
        (after > before).then_some(after)
    }
}

impl Default for Experience {
    fn default() -> Self {
        Self::new(DEFAULT_XP_PER_LEVEL)
    }
}
