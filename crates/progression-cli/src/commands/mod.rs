pub mod catalog;
pub mod config;
pub mod demo;
pub mod energy;
pub mod practice;

use progression_core::ProgressionEvent;

/// One line per event for human-readable output.
pub(crate) fn describe_event(event: &ProgressionEvent) -> String {
    match event {
        ProgressionEvent::AchievementUnlocked {
            definition_id,
            points,
            ..
        } => format!("achievement unlocked: {definition_id} (+{points} pts)"),
        ProgressionEvent::NodeUnlocked { node_id, .. } => format!("node unlocked: {node_id}"),
        ProgressionEvent::NodeMastered { node_id, .. } => format!("node mastered: {node_id}"),
        ProgressionEvent::LevelUp { level, .. } => format!("level up: {level}"),
        ProgressionEvent::SessionCompleted { summary, .. } => format!(
            "session finished: {}/{} correct{}",
            summary.score,
            summary.items_total,
            if summary.abandoned { " (abandoned)" } else { "" }
        ),
    }
}
