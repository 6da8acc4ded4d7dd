//! Progress counters and the achievement/badge rules they drive.

mod achievement;
pub mod counters;

pub use achievement::{
    AchievementCategory, AchievementDefinition, AchievementEngine, AchievementState,
    AchievementTarget, AchievementTier, AchievementUnlocked,
};
pub use counters::{CounterDefinition, CounterKind, ProgressCounterSet};
