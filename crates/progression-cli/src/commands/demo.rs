//! Scripted walkthrough of every facade command on the built-in catalog.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use progression_core::{
    Catalog, Config, LearnerSnapshot, ManualClock, ProgressionEvent, ProgressionFacade,
};

use super::describe_event;

const LEARNER: &str = "demo-learner";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DemoReport {
    events: Vec<ProgressionEvent>,
    snapshot: LearnerSnapshot,
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let facade = ProgressionFacade::new(Catalog::builtin()?, Config::default(), clock.clone());
    let mut events = Vec::new();
    let say = |line: String| {
        if !json {
            println!("{line}");
        }
    };

    facade.enroll(LEARNER)?;
    say(format!("enrolled {LEARNER}"));

    let energy = facade.spend_energy(LEARNER, 60)?;
    say(format!("spent 60 energy -> {}/{}", energy.balance, energy.max));
    if let Err(err) = facade.spend_energy(LEARNER, 50) {
        say(format!("spend 50 refused: {err}"));
    }
    clock.advance(Duration::minutes(17));
    let energy = facade.energy(LEARNER)?;
    say(format!("17 minutes later -> {}/{}", energy.balance, energy.max));
    let energy = facade.grant_energy(LEARNER, 5)?;
    say(format!("granted 5 -> {}/{}", energy.balance, energy.max));

    for _ in 0..7 {
        events.extend(facade.record_progress(LEARNER, "streakDays", 1)?.events);
    }
    say("studied 7 days in a row".to_string());
    events.extend(facade.record_progress(LEARNER, "lessonsCompleted", 3)?.events);

    for (node, percent) in [("counting", 100), ("addition", 75), ("subtraction", 60)] {
        let update = facade.set_node_progress(LEARNER, node, percent)?;
        let touched: Vec<_> = update
            .affected_nodes
            .iter()
            .map(|n| format!("{}={}", n.node_id, n.status))
            .collect();
        say(format!("{node} -> {percent}%: {}", touched.join(", ")));
        events.extend(update.events);
    }
    let status = facade.unlock_status(LEARNER, "multiplication")?;
    say(format!("multiplication is {}", status.status));

    let session = facade.start_exercise_from_bank(LEARNER, "capitals")?;
    if let Some(hint) = facade.request_hint(&session)? {
        say(format!("hint: {hint}"));
    }
    let outcome = facade.submit_answer(&session, "Lyon")?;
    say(format!("Lyon -> correct={}", outcome.correct));
    facade.retry(&session)?;
    facade.submit_answer(&session, "paris")?;
    facade.advance(&session)?;
    facade.submit_answer(&session, " Tokyo ")?;
    let result = facade.advance(&session)?;
    events.extend(result.events);

    if let Some(target) = facade.next_achievement(LEARNER)? {
        say(format!(
            "next achievement: {} ({}%)",
            target.definition_id,
            target.percent()
        ));
    }

    let snapshot = facade.snapshot(LEARNER)?;
    if json {
        let report = DemoReport { events, snapshot };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    for event in &events {
        println!("  * {}", describe_event(event));
    }
    println!(
        "level {} ({} xp, {} to next), {} achievement points",
        snapshot.level.level,
        snapshot.level.xp,
        snapshot.level.xp_for_next_level,
        snapshot.achievement_points
    );
    Ok(())
}
