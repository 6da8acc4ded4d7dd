use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::SessionSummary;
use crate::progress::AchievementUnlocked;
use crate::unlock::UnlockChange;

/// Every externally visible state change produces an event.
/// The UI renders them; a persistence collaborator may journal them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressionEvent {
    AchievementUnlocked {
        definition_id: String,
        points: u32,
        at: DateTime<Utc>,
    },
    /// A node's prerequisites are now satisfied.
    NodeUnlocked {
        node_id: String,
        at: DateTime<Utc>,
    },
    NodeMastered {
        node_id: String,
        at: DateTime<Utc>,
    },
    LevelUp {
        level: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        summary: SessionSummary,
        at: DateTime<Utc>,
    },
}

impl ProgressionEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            ProgressionEvent::AchievementUnlocked { at, .. }
            | ProgressionEvent::NodeUnlocked { at, .. }
            | ProgressionEvent::NodeMastered { at, .. }
            | ProgressionEvent::LevelUp { at, .. }
            | ProgressionEvent::SessionCompleted { at, .. } => *at,
        }
    }
}

impl From<AchievementUnlocked> for ProgressionEvent {
    fn from(unlocked: AchievementUnlocked) -> Self {
        ProgressionEvent::AchievementUnlocked {
            definition_id: unlocked.definition_id,
            points: unlocked.points,
            at: unlocked.at,
        }
    }
}

/// Events implied by one node's status change (zero, one or two).
pub(crate) fn events_for_change(change: &UnlockChange, at: DateTime<Utc>) -> Vec<ProgressionEvent> {
    let mut events = Vec::new();
    if change.newly_unlocked() {
        events.push(ProgressionEvent::NodeUnlocked {
            node_id: change.state.node_id.clone(),
            at,
        });
    }
    if change.newly_mastered() {
        events.push(ProgressionEvent::NodeMastered {
            node_id: change.state.node_id.clone(),
            at,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unlock::{UnlockState, UnlockStatus};

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ProgressionEvent::LevelUp {
            level: 3,
            at: DateTime::<Utc>::default(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LevelUp");
        assert_eq!(json["level"], 3);
    }

    #[test]
    fn locked_to_mastered_emits_both_events() {
        let change = UnlockChange {
            state: UnlockState {
                node_id: "fractions".into(),
                progress_percent: 100,
                status: UnlockStatus::Mastered,
            },
            previous: UnlockStatus::Locked,
        };
        let events = events_for_change(&change, DateTime::<Utc>::default());
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressionEvent::NodeUnlocked { .. }));
        assert!(matches!(events[1], ProgressionEvent::NodeMastered { .. }));
    }
}
