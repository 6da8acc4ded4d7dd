//! Energy ledger: balance, capacity and regeneration schedule.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const DEFAULT_REGEN_INTERVAL_MINUTES: u32 = 5;

/// Snapshot of a learner's energy.
///
/// Invariant: `0 <= balance <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyState {
    pub balance: u32,
    pub max: u32,
    pub last_regen_at: DateTime<Utc>,
}

/// Owns one learner's energy balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyLedger {
    state: EnergyState,
    regen_interval_minutes: u32,
}

impl EnergyLedger {
    /// A full ledger, as created at enrollment.
    pub fn new(max: u32, regen_interval_minutes: u32, now: DateTime<Utc>) -> Result<Self> {
        if max == 0 || regen_interval_minutes == 0 {
            return Err(CoreError::InvalidAmount);
        }
        Ok(Self {
            state: EnergyState {
                balance: max,
                max,
                last_regen_at: now,
            },
            regen_interval_minutes,
        })
    }

    /// Rebuild a ledger from a persisted state. The balance is clamped into range.
    pub fn from_state(mut state: EnergyState, regen_interval_minutes: u32) -> Result<Self> {
        if state.max == 0 || regen_interval_minutes == 0 {
            return Err(CoreError::InvalidAmount);
        }
        state.balance = state.balance.min(state.max);
        Ok(Self {
            state,
            regen_interval_minutes,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EnergyState {
        self.state
    }

    pub fn balance(&self) -> u32 {
        self.state.balance
    }

    pub fn max(&self) -> u32 {
        self.state.max
    }

    pub fn is_full(&self) -> bool {
        self.state.balance >= self.state.max
    }

    pub fn regen_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.regen_interval_minutes))
    }

    /// Time left until the next unit regenerates, or `None` when full.
    pub fn time_until_next(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_full() {
            return None;
        }
        let interval = self.regen_interval();
        let elapsed = (now - self.state.last_regen_at).max(Duration::zero());
        let into_tick = Duration::seconds(elapsed.num_seconds() % interval.num_seconds());
        Some(interval - into_tick)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Credit every full regeneration interval elapsed since `last_regen_at`.
    ///
    /// `last_regen_at` moves forward by whole intervals only, so partial
    /// progress toward the next unit carries over.
    ///
    /// At max this is not a pure no-op. The balance is left alone but
    /// `last_regen_at` is moved up to `now`, so time spent full is not
    /// banked. A spend made after a long stretch at max waits a whole
    /// interval for its first unit.
    ///
    /// Returns the number of units actually added.
    pub fn regenerate(&mut self, now: DateTime<Utc>) -> u32 {
        if self.is_full() {
            if now > self.state.last_regen_at {
                self.state.last_regen_at = now;
            }
            return 0;
        }

        let elapsed = now - self.state.last_regen_at;
        let interval_secs = i64::from(self.regen_interval_minutes) * 60;
        if elapsed.num_seconds() < interval_secs {
            return 0;
        }

        let units = elapsed.num_seconds() / interval_secs;
        let room = self.state.max - self.state.balance;
        let added = u32::try_from(units).unwrap_or(u32::MAX).min(room);

        self.state.balance += added;
        self.state.last_regen_at += Duration::seconds(units * interval_secs);

        tracing::debug!(
            units,
            added,
            balance = self.state.balance,
            "energy regenerated"
        );
        added
    }

    /// Deduct `amount`. Does not regenerate first.
    pub fn spend(&mut self, amount: u32) -> Result<u32> {
        if amount > self.state.balance {
            return Err(CoreError::InsufficientEnergy {
                requested: amount,
                balance: self.state.balance,
            });
        }
        self.state.balance -= amount;
        Ok(self.state.balance)
    }

    /// Add `amount`, discarding anything above `max`.
    pub fn grant(&mut self, amount: u32) -> u32 {
        self.state.balance = self.state.balance.saturating_add(amount).min(self.state.max);
        self.state.balance
    }

    /// Change capacity, clamping the balance down if needed.
    pub fn set_max(&mut self, new_max: u32) -> Result<()> {
        if new_max == 0 {
            return Err(CoreError::InvalidAmount);
        }
        self.state.max = new_max;
        self.state.balance = self.state.balance.min(new_max);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn ledger_with(balance: u32, max: u32) -> EnergyLedger {
        EnergyLedger::from_state(
            EnergyState {
                balance,
                max,
                last_regen_at: t0(),
            },
            DEFAULT_REGEN_INTERVAL_MINUTES,
        )
        .unwrap()
    }

    #[test]
    fn new_ledger_is_full() {
        let ledger = EnergyLedger::new(100, 5, t0()).unwrap();
        assert_eq!(ledger.balance(), 100);
        assert!(ledger.is_full());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            EnergyLedger::new(0, 5, t0()),
            Err(CoreError::InvalidAmount)
        ));
        assert!(EnergyLedger::new(10, 0, t0()).is_err());
    }

    #[test]
    fn regenerate_keeps_fractional_progress() {
        let mut ledger = ledger_with(40, 100);
        let added = ledger.regenerate(t0() + Duration::minutes(17));

        assert_eq!(added, 3);
        assert_eq!(ledger.balance(), 43);
        assert_eq!(ledger.state().last_regen_at, t0() + Duration::minutes(15));
        assert_eq!(
            ledger.time_until_next(t0() + Duration::minutes(17)),
            Some(Duration::minutes(3))
        );
    }

    #[test]
    fn regenerate_twice_in_same_interval_adds_nothing_more() {
        let mut ledger = ledger_with(40, 100);
        let now = t0() + Duration::minutes(17);
        ledger.regenerate(now);
        let added = ledger.regenerate(now + Duration::seconds(30));
        assert_eq!(added, 0);
        assert_eq!(ledger.balance(), 43);
    }

    #[test]
    fn regenerate_caps_at_max() {
        let mut ledger = ledger_with(98, 100);
        let added = ledger.regenerate(t0() + Duration::hours(2));
        assert_eq!(added, 2);
        assert_eq!(ledger.balance(), 100);
    }

    #[test]
    fn full_ledger_does_not_bank_time() {
        let mut ledger = ledger_with(100, 100);
        let later = t0() + Duration::hours(3);
        assert_eq!(ledger.regenerate(later), 0);
        assert_eq!(ledger.state().last_regen_at, later);

        ledger.spend(10).unwrap();
        assert_eq!(ledger.regenerate(later + Duration::minutes(4)), 0);
        assert_eq!(ledger.balance(), 90);
        assert_eq!(ledger.regenerate(later + Duration::minutes(5)), 1);
        assert_eq!(ledger.balance(), 91);
    }

    #[test]
    fn clock_going_backwards_is_ignored() {
        let mut ledger = ledger_with(10, 100);
        assert_eq!(ledger.regenerate(t0() - Duration::hours(1)), 0);
        assert_eq!(ledger.state().last_regen_at, t0());
    }

    #[test]
    fn spend_more_than_balance_fails_without_change() {
        let mut ledger = ledger_with(40, 100);
        let err = ledger.spend(50).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientEnergy {
                requested: 50,
                balance: 40
            }
        ));
        assert_eq!(ledger.balance(), 40);
    }

    #[test]
    fn spend_returns_new_balance() {
        let mut ledger = ledger_with(40, 100);
        assert_eq!(ledger.spend(40).unwrap(), 0);
    }

    #[test]
    fn grant_discards_excess() {
        let mut ledger = ledger_with(95, 100);
        assert_eq!(ledger.grant(20), 100);
    }

    #[test]
    fn set_max_clamps_balance() {
        let mut ledger = ledger_with(80, 100);
        ledger.set_max(50).unwrap();
        assert_eq!(ledger.balance(), 50);
        assert_eq!(ledger.max(), 50);

        ledger.set_max(120).unwrap();
        assert_eq!(ledger.balance(), 50);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Spend(u32),
        Grant(u32),
        Regenerate(i64),
        SetMax(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..150).prop_map(Op::Spend),
            (0u32..150).prop_map(Op::Grant),
            (0i64..600).prop_map(Op::Regenerate),
            (1u32..200).prop_map(Op::SetMax),
        ]
    }

    proptest! {
        #[test]
        fn balance_stays_within_bounds(
            start in 0u32..=100,
            ops in proptest::collection::vec(op(), 0..60),
        ) {
            let mut ledger = ledger_with(start, 100);
            let mut now = t0();
            for op in ops {
                match op {
                    Op::Spend(n) => { let _ = ledger.spend(n); }
                    Op::Grant(n) => { ledger.grant(n); }
                    Op::Regenerate(minutes) => {
                        now += Duration::minutes(minutes);
                        ledger.regenerate(now);
                    }
                    Op::SetMax(n) => { ledger.set_max(n).unwrap(); }
                }
                prop_assert!(ledger.balance() <= ledger.max());
            }
        }
    }
}
