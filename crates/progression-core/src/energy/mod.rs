//! Energy: a rate-limited per-learner action budget.
//!
//! Regeneration is computed lazily from elapsed wall-clock time whenever the
//! ledger is read or spent from; nothing runs in the background.

mod ledger;

pub use ledger::{EnergyLedger, EnergyState, DEFAULT_REGEN_INTERVAL_MINUTES};
