//! Exercise session state machine.
//!
//! ## State Transitions
//!
//! ```text
//! AwaitingAnswer --hint--> HintShown
//! (AwaitingAnswer | HintShown) --submit--> Evaluated
//! Evaluated(wrong) --retry--> AwaitingAnswer (same item)
//! Evaluated --advance--> AwaitingAnswer (next item) | Completed
//! any but Completed --abandon--> Completed
//! ```
//!
//! Hints never change the score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::item::ExerciseItem;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExerciseState {
    AwaitingAnswer,
    /// Sub-state of `AwaitingAnswer`: the hint is on screen, answers are
    /// still accepted.
    HintShown,
    Evaluated { correct: bool },
    Completed,
}

impl ExerciseState {
    fn accepts_answer(&self) -> bool {
        matches!(self, ExerciseState::AwaitingAnswer | ExerciseState::HintShown)
    }
}

impl fmt::Display for ExerciseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseState::AwaitingAnswer => f.write_str("awaiting an answer"),
            ExerciseState::HintShown => f.write_str("showing a hint"),
            ExerciseState::Evaluated { correct: true } => f.write_str("evaluated (correct)"),
            ExerciseState::Evaluated { correct: false } => f.write_str("evaluated (incorrect)"),
            ExerciseState::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub item_id: String,
    pub answered_correctly: bool,
    pub hint_used: bool,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub item_id: String,
    pub correct: bool,
    pub explanation: String,
    pub running_score: u32,
    pub running_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub score: u32,
    /// Running streak at the moment the session ended.
    pub streak: u32,
    pub best_streak: u32,
    pub items_total: u32,
    pub hints_used: u32,
    pub abandoned: bool,
}

impl SessionSummary {
    pub fn is_perfect(&self) -> bool {
        !self.abandoned && self.score == self.items_total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    pub state: ExerciseState,
    pub current_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}

/// One practice attempt over an ordered list of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSession {
    id: String,
    items: Vec<ExerciseItem>,
    current_index: usize,
    results: Vec<ItemResult>,
    running_score: u32,
    running_streak: u32,
    best_streak: u32,
    state: ExerciseState,
    started_at: DateTime<Utc>,
}

impl ExerciseSession {
    pub fn start(
        id: impl Into<String>,
        items: Vec<ExerciseItem>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if items.is_empty() {
            return Err(CoreError::EmptySession);
        }
        let results = items
            .iter()
            .map(|item| ItemResult {
                item_id: item.id.clone(),
                ..ItemResult::default()
            })
            .collect();
        Ok(Self {
            id: id.into(),
            items,
            current_index: 0,
            results,
            running_score: 0,
            running_streak: 0,
            best_streak: 0,
            state: ExerciseState::AwaitingAnswer,
            started_at: now,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ExerciseState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_item(&self) -> Option<&ExerciseItem> {
        if self.state == ExerciseState::Completed {
            return None;
        }
        self.items.get(self.current_index)
    }

    pub fn items_total(&self) -> usize {
        self.items.len()
    }

    pub fn running_score(&self) -> u32 {
        self.running_score
    }

    pub fn running_streak(&self) -> u32 {
        self.running_streak
    }

    pub fn results(&self) -> &[ItemResult] {
        &self.results
    }

    pub fn result_for(&self, item_id: &str) -> Option<&ItemResult> {
        self.results.iter().find(|r| r.item_id == item_id)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_completed(&self) -> bool {
        self.state == ExerciseState::Completed
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Reveal the current item's hint, if it has one.
    ///
    /// Marks the item as hinted at most once; items without a hint leave
    /// the session untouched and return `None`.
    pub fn request_hint(&mut self) -> Result<Option<String>> {
        if !self.state.accepts_answer() {
            return Err(self.invalid("request a hint"));
        }
        let hint = match self.items.get(self.current_index).and_then(|i| i.hint.clone()) {
            Some(hint) => hint,
            None => return Ok(None),
        };
        if let Some(result) = self.results.get_mut(self.current_index) {
            result.hint_used = true;
        }
        self.state = ExerciseState::HintShown;
        Ok(Some(hint))
    }

    pub fn submit_answer(&mut self, raw: &str) -> Result<AnswerOutcome> {
        if !self.state.accepts_answer() {
            return Err(self.invalid("submit an answer"));
        }
        let item = self
            .items
            .get(self.current_index)
            .ok_or_else(|| self.invalid("submit an answer"))?;
        let correct = item.is_correct(raw);
        let explanation = item.explanation.clone();
        let item_id = item.id.clone();

        if correct {
            self.running_score += 1;
            self.running_streak += 1;
            self.best_streak = self.best_streak.max(self.running_streak);
        } else {
            self.running_streak = 0;
        }
        if let Some(result) = self.results.get_mut(self.current_index) {
            result.attempts += 1;
            result.answered_correctly = correct;
        }
        self.state = ExerciseState::Evaluated { correct };

        Ok(AnswerOutcome {
            item_id,
            correct,
            explanation,
            running_score: self.running_score,
            running_streak: self.running_streak,
        })
    }

    /// Try the same item again after a wrong answer.
    pub fn retry(&mut self) -> Result<()> {
        if self.state != (ExerciseState::Evaluated { correct: false }) {
            return Err(self.invalid("retry"));
        }
        let hinted = self
            .results
            .get(self.current_index)
            .map(|r| r.hint_used)
            .unwrap_or(false);
        self.state = if hinted {
            ExerciseState::HintShown
        } else {
            ExerciseState::AwaitingAnswer
        };
        Ok(())
    }

    pub fn advance(&mut self) -> Result<AdvanceOutcome> {
        if !matches!(self.state, ExerciseState::Evaluated { .. }) {
            return Err(self.invalid("advance"));
        }
        if self.current_index + 1 < self.items.len() {
            self.current_index += 1;
            self.state = ExerciseState::AwaitingAnswer;
            return Ok(AdvanceOutcome {
                state: self.state,
                current_index: self.current_index,
                summary: None,
            });
        }
        self.state = ExerciseState::Completed;
        Ok(AdvanceOutcome {
            state: self.state,
            current_index: self.current_index,
            summary: Some(self.summary(false)),
        })
    }

    /// End the session early.
    pub fn abandon(&mut self) -> Result<SessionSummary> {
        if self.state == ExerciseState::Completed {
            return Err(self.invalid("abandon"));
        }
        self.state = ExerciseState::Completed;
        Ok(self.summary(true))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn summary(&self, abandoned: bool) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            score: self.running_score,
            streak: self.running_streak,
            best_streak: self.best_streak,
            items_total: self.items.len() as u32,
            hints_used: self.results.iter().filter(|r| r.hint_used).count() as u32,
            abandoned,
        }
    }

    fn invalid(&self, action: &str) -> CoreError {
        CoreError::InvalidTransition {
            state: self.state.to_string(),
            action: action.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn items() -> Vec<ExerciseItem> {
        vec![
            ExerciseItem::new("q1", "2 + 2", 4i64).with_explanation("two pairs"),
            ExerciseItem::new("q2", "Capital of Italy", "Rome").with_hint("Colosseum"),
            ExerciseItem::new("q3", "3 x 3", 9i64),
        ]
    }

    #[test]
    fn empty_session_is_rejected() {
        assert!(matches!(
            ExerciseSession::start("s", Vec::new(), now()),
            Err(CoreError::EmptySession)
        ));
    }

    #[test]
    fn correct_wrong_correct_yields_score_two_streak_one() {
        let mut session = ExerciseSession::start("s", items(), now()).unwrap();

        let outcome = session.submit_answer("4").unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.explanation, "two pairs");
        session.advance().unwrap();

        let outcome = session.submit_answer("Milan").unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.running_streak, 0);
        assert_eq!(outcome.running_score, 1);
        session.advance().unwrap();

        session.submit_answer(" 9 ").unwrap();
        let done = session.advance().unwrap();
        assert_eq!(done.state, ExerciseState::Completed);
        let summary = done.summary.unwrap();
        assert_eq!(summary.score, 2);
        assert_eq!(summary.streak, 1);
        assert_eq!(summary.best_streak, 1);
        assert_eq!(summary.items_total, 3);
        assert!(!summary.is_perfect());
    }

    #[test]
    fn hint_is_recorded_once_and_does_not_block_answers() {
        let mut session = ExerciseSession::start("s", items(), now()).unwrap();
        assert_eq!(session.request_hint().unwrap(), None);
        assert_eq!(session.state(), ExerciseState::AwaitingAnswer);

        session.submit_answer("4").unwrap();
        session.advance().unwrap();

        assert_eq!(session.request_hint().unwrap().as_deref(), Some("Colosseum"));
        assert_eq!(session.request_hint().unwrap().as_deref(), Some("Colosseum"));
        assert_eq!(session.state(), ExerciseState::HintShown);

        let outcome = session.submit_answer("rome").unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.running_score, 2);
        assert!(session.result_for("q2").unwrap().hint_used);

        session.advance().unwrap();
        session.submit_answer("9").unwrap();
        let summary = session.advance().unwrap().summary.unwrap();
        assert_eq!(summary.hints_used, 1);
        assert_eq!(summary.score, 3);
        assert!(summary.is_perfect());
    }

    #[test]
    fn retry_returns_to_same_item() {
        let mut session = ExerciseSession::start("s", items(), now()).unwrap();
        session.submit_answer("5").unwrap();
        session.retry().unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.state(), ExerciseState::AwaitingAnswer);

        let outcome = session.submit_answer("4").unwrap();
        assert!(outcome.correct);
        assert_eq!(session.result_for("q1").unwrap().attempts, 2);
        assert!(matches!(session.retry(), Err(CoreError::InvalidTransition { .. })));
    }

    #[test]
    fn retry_keeps_hint_visible() {
        let mut session = ExerciseSession::start("s", items(), now()).unwrap();
        session.submit_answer("4").unwrap();
        session.advance().unwrap();
        session.request_hint().unwrap();
        session.submit_answer("Naples").unwrap();
        session.retry().unwrap();
        assert_eq!(session.state(), ExerciseState::HintShown);
    }

    #[test]
    fn commands_out_of_order_are_rejected() {
        let mut session = ExerciseSession::start("s", items(), now()).unwrap();
        assert!(matches!(session.advance(), Err(CoreError::InvalidTransition { .. })));
        session.submit_answer("4").unwrap();
        assert!(session.submit_answer("4").is_err());
        assert!(session.request_hint().is_err());
    }

    #[test]
    fn abandon_finalizes_early() {
        let mut session = ExerciseSession::start("s", items(), now()).unwrap();
        session.submit_answer("4").unwrap();
        let summary = session.abandon().unwrap();
        assert!(summary.abandoned);
        assert_eq!(summary.score, 1);
        assert!(!summary.is_perfect());
        assert!(session.is_completed());
        assert!(session.current_item().is_none());
        assert!(session.abandon().is_err());
    }
}
