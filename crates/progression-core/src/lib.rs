//! # Progression Core Library
//!
//! Learner progression engine for an educational app: energy that gates
//! practice, counters that drive achievements, a prerequisite graph that
//! unlocks content, and the exercise sessions that feed all of it.
//!
//! The crate is storage-agnostic and performs no I/O outside of loading
//! its configuration and catalog. A CLI binary drives it for inspection
//! and simulation; a UI would sit on top of [`ProgressionFacade`] the same way.
//!
//! ## Architecture
//!
//! - **Energy**: lazily regenerating bounded ledger
//! - **Progress**: named counters and the achievement rules evaluated against them
//! - **Unlock**: prerequisite DAG with cascading status propagation
//! - **Exercise**: per-session state machine over an ordered item list
//! - **Facade**: per-learner state store that orders the cross-cutting effects
//!
//! ## Key Components
//!
//! - [`ProgressionFacade`]: Entry point for every learner command
//! - [`Catalog`]: Validated achievements, unlock nodes and item banks
//! - [`Config`]: Engine configuration management
//! - [`Clock`]: Time source, swappable in tests

pub mod catalog;
pub mod clock;
pub mod config;
pub mod energy;
pub mod error;
pub mod events;
pub mod exercise;
pub mod experience;
pub mod facade;
pub mod progress;
pub mod unlock;

pub use catalog::{Catalog, CatalogDocument};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use energy::{EnergyLedger, EnergyState};
pub use error::{CatalogError, ConfigError, CoreError, ErrorKind};
pub use events::ProgressionEvent;
pub use exercise::{
    AdvanceOutcome, Answer, AnswerOutcome, ExerciseItem, ExerciseSession, ExerciseState,
    ItemBank, ItemType, SessionSummary,
};
pub use experience::{Experience, LevelStatus};
pub use facade::{
    AdvanceResult, LearnerSnapshot, NodeProgressUpdate, ProgressUpdate, ProgressionFacade,
};
pub use progress::{
    AchievementDefinition, AchievementEngine, AchievementTarget, AchievementUnlocked,
    CounterDefinition, CounterKind, ProgressCounterSet,
};
pub use unlock::{UnlockGraph, UnlockNode, UnlockProgress, UnlockState, UnlockStatus};
