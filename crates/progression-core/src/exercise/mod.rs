//! Practice exercises: item banks and the per-attempt session state machine.

mod item;
mod session;

pub use item::{normalize_answer, Answer, ExerciseItem, ItemBank, ItemType};
pub use session::{
    AdvanceOutcome, AnswerOutcome, ExerciseSession, ExerciseState, ItemResult, SessionSummary,
};
