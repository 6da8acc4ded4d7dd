//! Per-learner unlock state over a shared [`UnlockGraph`].

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::graph::UnlockGraph;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnlockStatus {
    Locked,
    Available,
    InProgress,
    Mastered,
}

impl fmt::Display for UnlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnlockStatus::Locked => "locked",
            UnlockStatus::Available => "available",
            UnlockStatus::InProgress => "in-progress",
            UnlockStatus::Mastered => "mastered",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockState {
    pub node_id: String,
    pub progress_percent: u8,
    pub status: UnlockStatus,
}

/// A node touched by a progress update, with the status it had before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockChange {
    pub state: UnlockState,
    pub previous: UnlockStatus,
}

impl UnlockChange {
    pub fn newly_unlocked(&self) -> bool {
        self.previous == UnlockStatus::Locked && self.state.status != UnlockStatus::Locked
    }

    pub fn newly_mastered(&self) -> bool {
        self.previous != UnlockStatus::Mastered && self.state.status == UnlockStatus::Mastered
    }
}

/// Progress percent and derived status for every node, for one learner.
///
/// Progress is recorded even while a node is locked; it simply stays locked
/// until its prerequisites clear their thresholds.
#[derive(Debug, Clone)]
pub struct UnlockProgress {
    graph: Arc<UnlockGraph>,
    percents: Vec<u8>,
    statuses: Vec<UnlockStatus>,
}

impl UnlockProgress {
    pub fn new(graph: Arc<UnlockGraph>) -> Self {
        let mut progress = Self {
            percents: vec![0; graph.len()],
            statuses: vec![UnlockStatus::Locked; graph.len()],
            graph,
        };
        for i in 0..progress.statuses.len() {
            progress.statuses[i] = progress.compute_status(i);
        }
        progress
    }

    /// Rebuild from persisted percents. Unknown node ids are rejected.
    pub fn from_percents<'a>(
        graph: Arc<UnlockGraph>,
        percents: impl IntoIterator<Item = (&'a str, u8)>,
    ) -> Result<Self> {
        let mut progress = Self::new(graph);
        for (id, pct) in percents {
            let i = progress.index(id)?;
            progress.percents[i] = pct.min(100);
        }
        for i in 0..progress.statuses.len() {
            progress.statuses[i] = progress.compute_status(i);
        }
        Ok(progress)
    }

    pub fn graph(&self) -> &Arc<UnlockGraph> {
        &self.graph
    }

    fn index(&self, node_id: &str) -> Result<usize> {
        self.graph
            .index_of(node_id)
            .ok_or_else(|| CoreError::UnknownNode(node_id.to_string()))
    }

    fn compute_status(&self, i: usize) -> UnlockStatus {
        let blocked = self.graph.prerequisites_at(i).iter().any(|&p| {
            let threshold = self
                .graph
                .node_at(p)
                .map(|n| n.completion_threshold)
                .unwrap_or(100);
            self.percents[p] < threshold
        });
        match self.percents[i] {
            _ if blocked => UnlockStatus::Locked,
            100 => UnlockStatus::Mastered,
            0 => UnlockStatus::Available,
            _ => UnlockStatus::InProgress,
        }
    }

    fn state_at(&self, i: usize) -> Result<UnlockState> {
        let node = self
            .graph
            .node_at(i)
            .ok_or_else(|| CoreError::InconsistentGraph(format!("no node at index {i}")))?;
        Ok(UnlockState {
            node_id: node.id.clone(),
            progress_percent: self.percents[i],
            status: self.statuses[i],
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status_of(&self, node_id: &str) -> Result<UnlockState> {
        let i = self.index(node_id)?;
        self.state_at(i)
    }

    pub fn is_reachable(&self, node_id: &str) -> Result<bool> {
        Ok(self.status_of(node_id)?.status != UnlockStatus::Locked)
    }

    pub fn states(&self) -> Vec<UnlockState> {
        (0..self.percents.len())
            .filter_map(|i| self.state_at(i).ok())
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set a node's percent (clamped to 0..=100) and recompute it and all of
    /// its transitive dependents, breadth first.
    ///
    /// The returned list always starts with the target node; dependents are
    /// included only when their status changed.
    pub fn set_progress(&mut self, node_id: &str, percent: i64) -> Result<Vec<UnlockChange>> {
        let target = self.index(node_id)?;
        let clamped = percent.clamp(0, 100) as u8;

        self.percents[target] = clamped;
        let previous = self.statuses[target];
        self.statuses[target] = self.compute_status(target);
        let mut changes = vec![UnlockChange {
            state: self.state_at(target)?,
            previous,
        }];

        let mut queue: VecDeque<usize> = self.graph.dependents_at(target).iter().copied().collect();
        let mut visited: HashSet<usize> = queue.iter().copied().collect();
        while let Some(i) = queue.pop_front() {
            if i >= self.statuses.len() {
                return Err(CoreError::InconsistentGraph(format!(
                    "dependent index {i} out of range"
                )));
            }
            let before = self.statuses[i];
            let after = self.compute_status(i);
            if before != after {
                self.statuses[i] = after;
                changes.push(UnlockChange {
                    state: self.state_at(i)?,
                    previous: before,
                });
            }
            for &next in self.graph.dependents_at(i) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        tracing::debug!(
            node = node_id,
            percent = clamped,
            changed = changes.len(),
            "unlock progress updated"
        );
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unlock::graph::UnlockNode;
    use proptest::prelude::*;

    fn course() -> Arc<UnlockGraph> {
        Arc::new(
            UnlockGraph::new(vec![
                UnlockNode::new("counting", &[], 80),
                UnlockNode::new("addition", &["counting"], 70),
                UnlockNode::new("subtraction", &["counting"], 70),
                UnlockNode::new("multiplication", &["addition", "subtraction"], 100),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn root_nodes_start_available() {
        let progress = UnlockProgress::new(course());
        assert_eq!(progress.status_of("counting").unwrap().status, UnlockStatus::Available);
        assert_eq!(progress.status_of("addition").unwrap().status, UnlockStatus::Locked);
        assert!(!progress.is_reachable("multiplication").unwrap());
    }

    #[test]
    fn crossing_threshold_unlocks_dependents() {
        let mut progress = UnlockProgress::new(course());
        let changes = progress.set_progress("counting", 79).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].state.status, UnlockStatus::InProgress);

        let changes = progress.set_progress("counting", 80).unwrap();
        let unlocked: Vec<_> = changes
            .iter()
            .filter(|c| c.newly_unlocked())
            .map(|c| c.state.node_id.as_str())
            .collect();
        assert_eq!(unlocked, vec!["addition", "subtraction"]);
    }

    #[test]
    fn node_needs_every_prerequisite() {
        let mut progress = UnlockProgress::new(course());
        progress.set_progress("counting", 100).unwrap();
        progress.set_progress("addition", 70).unwrap();
        assert!(!progress.is_reachable("multiplication").unwrap());

        let changes = progress.set_progress("subtraction", 90).unwrap();
        assert!(changes
            .iter()
            .any(|c| c.state.node_id == "multiplication" && c.newly_unlocked()));
    }

    #[test]
    fn percent_is_clamped_and_mastery_reported() {
        let mut progress = UnlockProgress::new(course());
        let changes = progress.set_progress("counting", 250).unwrap();
        assert_eq!(changes[0].state.progress_percent, 100);
        assert!(changes[0].newly_mastered());

        progress.set_progress("counting", -5).unwrap();
        assert_eq!(progress.status_of("counting").unwrap().progress_percent, 0);
        assert!(!progress.is_reachable("addition").unwrap());
    }

    #[test]
    fn locked_node_keeps_progress() {
        let mut progress = UnlockProgress::new(course());
        progress.set_progress("addition", 40).unwrap();
        let state = progress.status_of("addition").unwrap();
        assert_eq!(state.status, UnlockStatus::Locked);
        assert_eq!(state.progress_percent, 40);

        let changes = progress.set_progress("counting", 80).unwrap();
        let addition = changes.iter().find(|c| c.state.node_id == "addition").unwrap();
        assert_eq!(addition.state.status, UnlockStatus::InProgress);
    }

    #[test]
    fn unknown_node_is_rejected() {
        let mut progress = UnlockProgress::new(course());
        assert!(matches!(
            progress.set_progress("geometry", 10),
            Err(CoreError::UnknownNode(id)) if id == "geometry"
        ));
    }

    #[test]
    fn from_percents_restores_statuses() {
        let progress =
            UnlockProgress::from_percents(course(), [("counting", 90), ("addition", 100)]).unwrap();
        assert_eq!(progress.status_of("addition").unwrap().status, UnlockStatus::Mastered);
        assert_eq!(progress.status_of("subtraction").unwrap().status, UnlockStatus::Available);
    }

    fn random_dag() -> impl Strategy<Value = Vec<UnlockNode>> {
        (2usize..8).prop_flat_map(|n| {
            proptest::collection::vec(
                (proptest::collection::vec(any::<bool>(), n), 0u8..=100),
                n,
            )
            .prop_map(move |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (edges, threshold))| {
                        let prereqs: Vec<String> = (0..i)
                            .filter(|&j| edges[j])
                            .map(|j| format!("n{j}"))
                            .collect();
                        UnlockNode {
                            id: format!("n{i}"),
                            title: String::new(),
                            prerequisites: prereqs,
                            completion_threshold: threshold,
                            counter: None,
                        }
                    })
                    .collect()
            })
        })
    }

    proptest! {
        #[test]
        fn reachable_nodes_have_satisfied_prerequisites(
            nodes in random_dag(),
            updates in proptest::collection::vec((0usize..8, -20i64..130), 0..30),
        ) {
            let graph = Arc::new(UnlockGraph::new(nodes).unwrap());
            let mut progress = UnlockProgress::new(graph.clone());
            for (node, pct) in updates {
                let id = format!("n{}", node % graph.len());
                progress.set_progress(&id, pct).unwrap();
            }

            let fresh = UnlockProgress::from_percents(
                graph.clone(),
                progress.states().iter().map(|s| (s.node_id.as_str(), s.progress_percent)).collect::<Vec<_>>(),
            ).unwrap();
            prop_assert_eq!(progress.states(), fresh.states());

            for node in graph.nodes() {
                let state = progress.status_of(&node.id).unwrap();
                if state.status != UnlockStatus::Locked {
                    for prereq in &node.prerequisites {
                        let p = progress.status_of(prereq).unwrap();
                        let threshold = graph.node(prereq).unwrap().completion_threshold;
                        prop_assert!(p.progress_percent >= threshold);
                    }
                }
            }
        }
    }
}
