//! Prerequisite-gated unlock graph.
//!
//! [`UnlockGraph`] is the validated catalog structure shared by every
//! learner; [`UnlockProgress`] holds one learner's percents and statuses.

mod graph;
mod state;

pub use graph::{CounterBinding, UnlockGraph, UnlockNode};
pub use state::{UnlockChange, UnlockProgress, UnlockState, UnlockStatus};
