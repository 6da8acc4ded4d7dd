//! Scripted exercise session.

use clap::Args;
use serde::Serialize;

use progression_core::{
    AnswerOutcome, Config, ProgressionEvent, ProgressionFacade, SessionSummary,
};

use super::describe_event;

const PRACTICE_LEARNER: &str = "cli-learner";

#[derive(Args)]
pub struct PracticeArgs {
    /// Item bank id from the catalog
    #[arg(long)]
    bank: String,
    /// Answers in item order, comma separated
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    answers: Vec<String>,
    /// 1-based item positions to request a hint for
    #[arg(long, value_delimiter = ',')]
    hints: Vec<usize>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PracticeReport {
    answers: Vec<AnswerOutcome>,
    summary: Option<SessionSummary>,
    events: Vec<ProgressionEvent>,
}

pub fn run(args: PracticeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let facade = ProgressionFacade::from_config(Config::current())?;
    facade.enroll(PRACTICE_LEARNER)?;
    let session = facade.start_exercise_from_bank(PRACTICE_LEARNER, &args.bank)?;

    let mut report = PracticeReport {
        answers: Vec::new(),
        summary: None,
        events: Vec::new(),
    };

    for (index, answer) in args.answers.iter().enumerate() {
        let Some(item) = facade.current_item(&session)? else {
            break;
        };
        if !args.json {
            println!("Q{}: {}", index + 1, item.question);
            if let Some(options) = &item.options {
                println!("    options: {}", options.join(" | "));
            }
        }
        if args.hints.contains(&(index + 1)) {
            if let Some(hint) = facade.request_hint(&session)? {
                if !args.json {
                    println!("    hint: {hint}");
                }
            }
        }

        let outcome = facade.submit_answer(&session, answer)?;
        if !args.json {
            println!(
                "    {} -> {} (score {}, streak {})",
                answer,
                if outcome.correct { "correct" } else { "wrong" },
                outcome.running_score,
                outcome.running_streak
            );
            if !outcome.correct && !outcome.explanation.is_empty() {
                println!("    {}", outcome.explanation);
            }
        }
        report.answers.push(outcome);

        let result = facade.advance(&session)?;
        report.events.extend(result.events);
        if result.summary.is_some() {
            report.summary = result.summary;
            break;
        }
    }

    // Ran out of answers before the last item.
    if report.summary.is_none() {
        tracing::warn!(
            bank = %args.bank,
            answered = report.answers.len(),
            "out of answers, abandoning session"
        );
        let result = facade.abandon(&session)?;
        report.events.extend(result.events);
        report.summary = result.summary;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(summary) = &report.summary {
        println!();
        println!(
            "Score: {}/{}  best streak: {}  hints: {}",
            summary.score, summary.items_total, summary.best_streak, summary.hints_used
        );
    }
    for event in &report.events {
        println!("  * {}", describe_event(event));
    }
    Ok(())
}
