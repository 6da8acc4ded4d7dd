//! Single entry point for the UI.
//!
//! Every command follows the same pipeline:
//!
//! ```text
//! validate -> mutate one of energy | counters | session | node
//!          -> re-evaluate achievements
//!          -> re-run unlock cascades (counter-bound nodes included)
//!          -> return balances + emitted events
//! ```
//!
//! Each learner's state sits behind its own mutex, so commands for one
//! learner are serialized while different learners proceed in parallel.
//! Nothing here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::catalog::Catalog;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::energy::{EnergyLedger, EnergyState};
use crate::error::{CoreError, Result};
use crate::events::{events_for_change, ProgressionEvent};
use crate::exercise::{
    AdvanceOutcome, AnswerOutcome, ExerciseItem, ExerciseSession, ExerciseState, SessionSummary,
};
use crate::experience::{Experience, LevelStatus};
use crate::progress::counters::{EXERCISES_SOLVED, PERFECT_QUIZZES, SESSIONS_COMPLETED};
use crate::progress::{
    AchievementEngine, AchievementState, AchievementTarget, AchievementUnlocked,
    ProgressCounterSet,
};
use crate::unlock::{UnlockChange, UnlockProgress, UnlockState};

/// Result of a counter mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub counters: BTreeMap<String, u64>,
    pub unlocked_achievements: Vec<AchievementUnlocked>,
    pub affected_nodes: Vec<UnlockState>,
    pub level: LevelStatus,
    pub events: Vec<ProgressionEvent>,
}

/// Result of a direct node progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProgressUpdate {
    pub affected_nodes: Vec<UnlockState>,
    pub events: Vec<ProgressionEvent>,
}

/// Result of `advance`/`abandon`. `summary` is set once the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResult {
    pub state: ExerciseState,
    pub current_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
    pub level: LevelStatus,
    pub events: Vec<ProgressionEvent>,
}

/// Everything the engine knows about a learner, for rendering or persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSnapshot {
    pub learner_id: String,
    pub energy: EnergyState,
    pub counters: BTreeMap<String, u64>,
    pub achievements: Vec<AchievementState>,
    pub achievement_points: u64,
    pub unlocks: Vec<UnlockState>,
    pub level: LevelStatus,
    pub active_session: Option<String>,
}

/// Per-learner record. Only ever touched under its mutex.
struct LearnerState {
    energy: EnergyLedger,
    achievements: AchievementEngine,
    unlocks: UnlockProgress,
    experience: Experience,
    session: Option<ExerciseSession>,
}

#[derive(Default)]
struct Settlement {
    unlocked: Vec<AchievementUnlocked>,
    changes: Vec<UnlockChange>,
}

pub struct ProgressionFacade {
    catalog: Catalog,
    config: Config,
    clock: Arc<dyn Clock>,
    learners: RwLock<HashMap<String, Arc<Mutex<LearnerState>>>>,
    /// session id -> learner id
    sessions: Mutex<HashMap<String, String>>,
}

impl ProgressionFacade {
    pub fn new(catalog: Catalog, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            config,
            clock,
            learners: RwLock::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Load the configured catalog and use the wall clock.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let catalog = config.catalog()?;
        Ok(Self::new(catalog, config, Arc::new(SystemClock)))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Learners ─────────────────────────────────────────────────────

    /// Create a learner with full energy, zeroed counters and nothing unlocked.
    pub fn enroll(&self, learner_id: &str) -> Result<LearnerSnapshot> {
        let now = self.clock.now();
        let counters = ProgressCounterSet::from_definitions(self.catalog.counters());
        let state = LearnerState {
            energy: EnergyLedger::new(
                self.config.energy.max,
                self.config.energy.regen_interval_minutes,
                now,
            )?,
            achievements: AchievementEngine::new(self.catalog.achievements().clone(), counters)?,
            unlocks: UnlockProgress::new(self.catalog.graph().clone()),
            experience: Experience::new(self.config.experience.xp_per_level),
            session: None,
        };
        let snapshot = self.snapshot_of(learner_id, &state);

        let mut learners = self.learners.write()?;
        if learners.contains_key(learner_id) {
            return Err(CoreError::LearnerAlreadyEnrolled(learner_id.to_string()));
        }
        learners.insert(learner_id.to_string(), Arc::new(Mutex::new(state)));
        tracing::info!(learner = learner_id, "learner enrolled");
        Ok(snapshot)
    }

    pub fn is_enrolled(&self, learner_id: &str) -> bool {
        self.learners
            .read()
            .map(|learners| learners.contains_key(learner_id))
            .unwrap_or(false)
    }

    pub fn snapshot(&self, learner_id: &str) -> Result<LearnerSnapshot> {
        let learner = self.learner(learner_id)?;
        let state = learner.lock()?;
        Ok(self.snapshot_of(learner_id, &state))
    }

    // ── Energy ───────────────────────────────────────────────────────

    pub fn regenerate_energy(&self, learner_id: &str, now: DateTime<Utc>) -> Result<EnergyState> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        state.energy.regenerate(now);
        Ok(state.energy.state())
    }

    /// Current energy, regenerated up to the clock's `now`.
    pub fn energy(&self, learner_id: &str) -> Result<EnergyState> {
        self.regenerate_energy(learner_id, self.clock.now())
    }

    /// Regenerate, then spend. Fails without side effects beyond the
    /// regeneration when the balance is too low.
    pub fn spend_energy(&self, learner_id: &str, amount: u32) -> Result<EnergyState> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        state.energy.regenerate(self.clock.now());
        state.energy.spend(amount).inspect_err(|err| {
            tracing::debug!(learner = learner_id, error = %err, "energy spend refused");
        })?;
        Ok(state.energy.state())
    }

    pub fn grant_energy(&self, learner_id: &str, amount: u32) -> Result<EnergyState> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        state.energy.regenerate(self.clock.now());
        state.energy.grant(amount);
        Ok(state.energy.state())
    }

    pub fn set_energy_max(&self, learner_id: &str, new_max: u32) -> Result<EnergyState> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        state.energy.regenerate(self.clock.now());
        state.energy.set_max(new_max)?;
        Ok(state.energy.state())
    }

    // ── Progress & achievements ──────────────────────────────────────

    pub fn record_progress(
        &self,
        learner_id: &str,
        counter_key: &str,
        delta: i64,
    ) -> Result<ProgressUpdate> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        let before = state.achievements.counters().values().clone();
        state.achievements.record_event(counter_key, delta)?;
        self.progress_update(&mut state, &before)
    }

    /// Break a streak counter.
    pub fn reset_streak(&self, learner_id: &str, counter_key: &str) -> Result<ProgressUpdate> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        let before = state.achievements.counters().values().clone();
        state.achievements.counters_mut().reset(counter_key)?;
        self.progress_update(&mut state, &before)
    }

    pub fn next_achievement(&self, learner_id: &str) -> Result<Option<AchievementTarget>> {
        let learner = self.learner(learner_id)?;
        let state = learner.lock()?;
        Ok(state.achievements.next_target())
    }

    // ── Unlocks ──────────────────────────────────────────────────────

    pub fn unlock_status(&self, learner_id: &str, node_id: &str) -> Result<UnlockState> {
        let learner = self.learner(learner_id)?;
        let state = learner.lock()?;
        state.unlocks.status_of(node_id)
    }

    pub fn is_reachable(&self, learner_id: &str, node_id: &str) -> Result<bool> {
        let learner = self.learner(learner_id)?;
        let state = learner.lock()?;
        state.unlocks.is_reachable(node_id)
    }

    pub fn set_node_progress(
        &self,
        learner_id: &str,
        node_id: &str,
        percent: i64,
    ) -> Result<NodeProgressUpdate> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        let now = self.clock.now();
        let before = state.achievements.counters().values().clone();

        let mut changes = state.unlocks.set_progress(node_id, percent)?;
        let mut events: Vec<ProgressionEvent> = changes
            .iter()
            .flat_map(|change| events_for_change(change, now))
            .collect();
        let settlement = self.settle(&mut state, &before, now, &mut events)?;
        changes.extend(settlement.changes);

        Ok(NodeProgressUpdate {
            affected_nodes: changes.into_iter().map(|c| c.state).collect(),
            events,
        })
    }

    // ── Exercise sessions ────────────────────────────────────────────

    /// Open a session. A learner may only have one open at a time.
    pub fn start_exercise(&self, learner_id: &str, items: Vec<ExerciseItem>) -> Result<String> {
        let learner = self.learner(learner_id)?;
        let mut state = learner.lock()?;
        if let Some(active) = &state.session {
            return Err(CoreError::SessionAlreadyActive {
                learner_id: learner_id.to_string(),
                session_id: active.id().to_string(),
            });
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let session = ExerciseSession::start(session_id.clone(), items, self.clock.now())?;
        self.sessions
            .lock()?
            .insert(session_id.clone(), learner_id.to_string());
        tracing::debug!(
            learner = learner_id,
            session = %session_id,
            items = session.items_total(),
            "exercise session started"
        );
        state.session = Some(session);
        Ok(session_id)
    }

    pub fn start_exercise_from_bank(&self, learner_id: &str, bank_id: &str) -> Result<String> {
        let bank = self
            .catalog
            .bank(bank_id)
            .ok_or_else(|| CoreError::UnknownBank(bank_id.to_string()))?;
        self.start_exercise(learner_id, bank.items.clone())
    }

    pub fn current_item(&self, session_id: &str) -> Result<Option<ExerciseItem>> {
        self.with_session(session_id, |session| Ok(session.current_item().cloned()))
    }

    pub fn session_state(&self, session_id: &str) -> Result<ExerciseState> {
        self.with_session(session_id, |session| Ok(session.state()))
    }

    pub fn submit_answer(&self, session_id: &str, raw: &str) -> Result<AnswerOutcome> {
        self.with_session(session_id, |session| session.submit_answer(raw))
    }

    pub fn request_hint(&self, session_id: &str) -> Result<Option<String>> {
        self.with_session(session_id, |session| session.request_hint())
    }

    pub fn retry(&self, session_id: &str) -> Result<()> {
        self.with_session(session_id, |session| session.retry())
    }

    /// Move to the next item; on the last item this finalizes the session,
    /// credits XP and feeds the summary into the counters.
    pub fn advance(&self, session_id: &str) -> Result<AdvanceResult> {
        let (learner_id, learner) = self.session_owner(session_id)?;
        let mut state = learner.lock()?;
        let outcome = self.active_session(&mut state, session_id)?.advance()?;
        match outcome.summary.clone() {
            Some(summary) => self.finish_session(&learner_id, &mut state, outcome, summary),
            None => Ok(AdvanceResult {
                state: outcome.state,
                current_index: outcome.current_index,
                summary: None,
                level: state.experience.status(),
                events: Vec::new(),
            }),
        }
    }

    /// End a session early. Its score still earns XP.
    pub fn abandon(&self, session_id: &str) -> Result<AdvanceResult> {
        let (learner_id, learner) = self.session_owner(session_id)?;
        let mut state = learner.lock()?;
        let session = self.active_session(&mut state, session_id)?;
        let summary = session.abandon()?;
        let outcome = AdvanceOutcome {
            state: session.state(),
            current_index: session.current_index(),
            summary: Some(summary.clone()),
        };
        self.finish_session(&learner_id, &mut state, outcome, summary)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn learner(&self, learner_id: &str) -> Result<Arc<Mutex<LearnerState>>> {
        self.learners
            .read()?
            .get(learner_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownLearner(learner_id.to_string()))
    }

    fn session_owner(&self, session_id: &str) -> Result<(String, Arc<Mutex<LearnerState>>)> {
        let learner_id = self
            .sessions
            .lock()?
            .get(session_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownSession(session_id.to_string()))?;
        let learner = self.learner(&learner_id)?;
        Ok((learner_id, learner))
    }

    fn active_session<'a>(
        &self,
        state: &'a mut LearnerState,
        session_id: &str,
    ) -> Result<&'a mut ExerciseSession> {
        state
            .session
            .as_mut()
            .filter(|session| session.id() == session_id)
            .ok_or_else(|| CoreError::UnknownSession(session_id.to_string()))
    }

    fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut ExerciseSession) -> Result<T>,
    ) -> Result<T> {
        let (_, learner) = self.session_owner(session_id)?;
        let mut state = learner.lock()?;
        f(self.active_session(&mut state, session_id)?)
    }

    fn finish_session(
        &self,
        learner_id: &str,
        state: &mut LearnerState,
        outcome: AdvanceOutcome,
        summary: SessionSummary,
    ) -> Result<AdvanceResult> {
        let now = self.clock.now();
        state.session = None;
        self.sessions.lock()?.remove(&summary.session_id);

        tracing::info!(
            learner = learner_id,
            session = %summary.session_id,
            score = summary.score,
            items = summary.items_total,
            abandoned = summary.abandoned,
            "exercise session finished"
        );

        let mut events = vec![ProgressionEvent::SessionCompleted {
            summary: summary.clone(),
            at: now,
        }];

        let before = state.achievements.counters().values().clone();
        let counters = state.achievements.counters_mut();
        counters.record_if_defined(EXERCISES_SOLVED, u64::from(summary.score));
        if !summary.abandoned {
            counters.record_if_defined(SESSIONS_COMPLETED, 1);
        }
        if summary.is_perfect() {
            counters.record_if_defined(PERFECT_QUIZZES, 1);
        }

        let xp = u64::from(summary.score) * self.config.experience.xp_per_correct_answer;
        self.credit_xp(state, xp, now, &mut events);
        self.settle(state, &before, now, &mut events)?;

        Ok(AdvanceResult {
            state: outcome.state,
            current_index: outcome.current_index,
            summary: Some(summary),
            level: state.experience.status(),
            events,
        })
    }

    fn progress_update(
        &self,
        state: &mut LearnerState,
        before: &BTreeMap<String, u64>,
    ) -> Result<ProgressUpdate> {
        let now = self.clock.now();
        let mut events = Vec::new();
        let settlement = self.settle(state, before, now, &mut events)?;
        Ok(ProgressUpdate {
            counters: state.achievements.counters().values().clone(),
            unlocked_achievements: settlement.unlocked,
            affected_nodes: settlement.changes.into_iter().map(|c| c.state).collect(),
            level: state.experience.status(),
            events,
        })
    }

    /// Re-evaluate achievements, then re-sync nodes bound to a counter that
    /// moved since `before`. Bound nodes whose counter did not change keep
    /// whatever percent was last set on them.
    fn settle(
        &self,
        state: &mut LearnerState,
        before: &BTreeMap<String, u64>,
        now: DateTime<Utc>,
        events: &mut Vec<ProgressionEvent>,
    ) -> Result<Settlement> {
        let mut settlement = Settlement::default();

        let unlocked = state.achievements.evaluate(now)?;
        for achievement in &unlocked {
            events.push(achievement.clone().into());
            if self.config.experience.achievement_points_as_xp {
                self.credit_xp(state, u64::from(achievement.points), now, events);
            }
        }
        settlement.unlocked = unlocked;

        let graph = state.unlocks.graph().clone();
        for (node, binding) in graph.counter_bound() {
            let value = state.achievements.counters().get(&binding.key)?;
            if before.get(&binding.key) == Some(&value) {
                continue;
            }
            let percent = binding.percent_for(value);
            if state.unlocks.status_of(&node.id)?.progress_percent == percent {
                continue;
            }
            for change in state.unlocks.set_progress(&node.id, i64::from(percent))? {
                events.extend(events_for_change(&change, now));
                settlement.changes.push(change);
            }
        }

        for event in events.iter() {
            if let ProgressionEvent::NodeUnlocked { node_id, .. } = event {
                tracing::info!(node = %node_id, "node unlocked");
            }
        }
        Ok(settlement)
    }

    fn credit_xp(
        &self,
        state: &mut LearnerState,
        amount: u64,
        now: DateTime<Utc>,
        events: &mut Vec<ProgressionEvent>,
    ) {
        if let Some(level) = state.experience.credit(amount) {
            tracing::info!(level, "level up");
            events.push(ProgressionEvent::LevelUp { level, at: now });
        }
    }

    fn snapshot_of(&self, learner_id: &str, state: &LearnerState) -> LearnerSnapshot {
        LearnerSnapshot {
            learner_id: learner_id.to_string(),
            energy: state.energy.state(),
            counters: state.achievements.counters().values().clone(),
            achievements: state.achievements.states().to_vec(),
            achievement_points: state.achievements.total_points(),
            unlocks: state.unlocks.states(),
            level: state.experience.status(),
            active_session: state.session.as_ref().map(|s| s.id().to_string()),
        }
    }
}
