//! Energy regeneration simulator.

use chrono::{Duration, Utc};
use clap::Subcommand;
use serde::Serialize;

use progression_core::energy::DEFAULT_REGEN_INTERVAL_MINUTES;
use progression_core::{Clock, EnergyLedger, EnergyState, ManualClock};

#[derive(Subcommand)]
pub enum EnergyAction {
    /// Regenerate a ledger over a span of time, then optionally spend
    Simulate {
        /// Starting balance
        #[arg(long)]
        balance: u32,
        /// Capacity
        #[arg(long, default_value_t = 100)]
        max: u32,
        /// Minutes between regenerated units
        #[arg(long, default_value_t = DEFAULT_REGEN_INTERVAL_MINUTES)]
        interval: u32,
        /// Minutes elapsed since the last regeneration
        #[arg(long)]
        elapsed_minutes: i64,
        /// Amount to spend after regenerating
        #[arg(long)]
        spend: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationReport {
    regenerated: u32,
    spent: Option<u32>,
    /// Seconds until the next unit, absent when full.
    next_unit_in_secs: Option<i64>,
    state: EnergyState,
}

pub fn run(action: EnergyAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EnergyAction::Simulate {
            balance,
            max,
            interval,
            elapsed_minutes,
            spend,
            json,
        } => simulate(balance, max, interval, elapsed_minutes, spend, json),
    }
}

fn simulate(
    balance: u32,
    max: u32,
    interval: u32,
    elapsed_minutes: i64,
    spend: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if elapsed_minutes < 0 {
        return Err("elapsed minutes cannot be negative".into());
    }
    let clock = ManualClock::new(Utc::now());
    let mut ledger = EnergyLedger::from_state(
        EnergyState {
            balance,
            max,
            last_regen_at: clock.now(),
        },
        interval,
    )?;

    clock.advance(Duration::minutes(elapsed_minutes));
    let regenerated = ledger.regenerate(clock.now());
    if let Some(amount) = spend {
        ledger.spend(amount)?;
    }

    let report = SimulationReport {
        regenerated,
        spent: spend,
        next_unit_in_secs: ledger.time_until_next(clock.now()).map(|d| d.num_seconds()),
        state: ledger.state(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Regenerated: +{}", report.regenerated);
    if let Some(amount) = report.spent {
        println!("Spent:       -{amount}");
    }
    println!("Balance:     {}/{}", report.state.balance, report.state.max);
    match report.next_unit_in_secs {
        Some(secs) => println!("Next unit:   {}m {:02}s", secs / 60, secs % 60),
        None => println!("Next unit:   (full)"),
    }
    Ok(())
}
