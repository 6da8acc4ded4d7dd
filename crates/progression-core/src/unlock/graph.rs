//! Immutable prerequisite graph of curriculum nodes.
//!
//! Built once from catalog data and validated up front: every referenced
//! node must exist and the prerequisite relation must be acyclic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::CatalogError;

/// Optional link between a node and a progress counter. The node's
/// completion percent follows `value * 100 / target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterBinding {
    pub key: String,
    pub target: u64,
}

impl CounterBinding {
    pub fn percent_for(&self, value: u64) -> u8 {
        let pct = value.saturating_mul(100) / self.target.max(1);
        pct.min(100) as u8
    }
}

/// Catalog entry for a unit of curriculum content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Percent of this node a learner needs before its dependents open.
    #[serde(alias = "completionThreshold")]
    pub completion_threshold: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<CounterBinding>,
}

impl UnlockNode {
    pub fn new(id: impl Into<String>, prerequisites: &[&str], completion_threshold: u8) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            completion_threshold,
            counter: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Validated graph with precomputed adjacency in both directions.
#[derive(Debug, Clone)]
pub struct UnlockGraph {
    nodes: Vec<UnlockNode>,
    index: HashMap<String, usize>,
    prerequisites: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
}

impl UnlockGraph {
    pub fn new(nodes: Vec<UnlockNode>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "node",
                    id: node.id.clone(),
                });
            }
            if node.completion_threshold > 100 {
                return Err(CatalogError::InvalidDefinition {
                    id: node.id.clone(),
                    message: format!(
                        "completion threshold {} is outside 0..=100",
                        node.completion_threshold
                    ),
                });
            }
            if matches!(&node.counter, Some(binding) if binding.target == 0) {
                return Err(CatalogError::InvalidDefinition {
                    id: node.id.clone(),
                    message: "counter target must be greater than zero".into(),
                });
            }
        }

        let mut prerequisites = vec![Vec::new(); nodes.len()];
        let mut dependents = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for prereq in &node.prerequisites {
                let p = *index.get(prereq).ok_or_else(|| CatalogError::UnknownNode {
                    node: prereq.clone(),
                    referenced_by: node.id.clone(),
                })?;
                if !prerequisites[i].contains(&p) {
                    prerequisites[i].push(p);
                    dependents[p].push(i);
                }
            }
        }

        let graph = Self {
            nodes,
            index,
            prerequisites,
            dependents,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Three-color DFS over prerequisite edges.
    fn check_acyclic(&self) -> Result<(), CatalogError> {
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut path = Vec::new();
        for start in 0..self.nodes.len() {
            if colors[start] == Color::White {
                self.visit(start, &mut colors, &mut path)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        node: usize,
        colors: &mut [Color],
        path: &mut Vec<usize>,
    ) -> Result<(), CatalogError> {
        colors[node] = Color::Gray;
        path.push(node);
        for &next in &self.prerequisites[node] {
            match colors[next] {
                Color::Gray => {
                    let from = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle: Vec<String> = path[from..]
                        .iter()
                        .map(|&n| self.nodes[n].id.clone())
                        .collect();
                    cycle.push(self.nodes[next].id.clone());
                    return Err(CatalogError::CyclicPrerequisite { cycle });
                }
                Color::White => self.visit(next, colors, path)?,
                Color::Black => {}
            }
        }
        path.pop();
        colors[node] = Color::Black;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[UnlockNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&UnlockNode> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_at(&self, index: usize) -> Option<&UnlockNode> {
        self.nodes.get(index)
    }

    pub(crate) fn prerequisites_at(&self, index: usize) -> &[usize] {
        self.prerequisites.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn dependents_at(&self, index: usize) -> &[usize] {
        self.dependents.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of nodes that list `id` as a prerequisite.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.index_of(id)
            .map(|i| {
                self.dependents_at(i)
                    .iter()
                    .map(|&d| self.nodes[d].id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes whose percent is driven by a counter.
    pub fn counter_bound(&self) -> impl Iterator<Item = (&UnlockNode, &CounterBinding)> {
        self.nodes
            .iter()
            .filter_map(|node| node.counter.as_ref().map(|binding| (node, binding)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_three_node_cycle() {
        let err = UnlockGraph::new(vec![
            UnlockNode::new("a", &["b"], 50),
            UnlockNode::new("b", &["c"], 50),
            UnlockNode::new("c", &["a"], 50),
        ])
        .unwrap_err();
        match err {
            CatalogError::CyclicPrerequisite { cycle } => {
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn rejects_self_loop() {
        let err = UnlockGraph::new(vec![UnlockNode::new("a", &["a"], 50)]).unwrap_err();
        assert!(matches!(err, CatalogError::CyclicPrerequisite { .. }));
    }

    #[test]
    fn rejects_unknown_prerequisite() {
        let err = UnlockGraph::new(vec![UnlockNode::new("a", &["ghost"], 50)]).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownNode { node, referenced_by } if node == "ghost" && referenced_by == "a"
        ));
    }

    #[test]
    fn rejects_duplicates_and_bad_thresholds() {
        assert!(matches!(
            UnlockGraph::new(vec![UnlockNode::new("a", &[], 50), UnlockNode::new("a", &[], 50)]),
            Err(CatalogError::DuplicateId { .. })
        ));
        assert!(matches!(
            UnlockGraph::new(vec![UnlockNode::new("a", &[], 101)]),
            Err(CatalogError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn diamond_is_accepted() {
        let graph = UnlockGraph::new(vec![
            UnlockNode::new("basics", &[], 80),
            UnlockNode::new("left", &["basics"], 80),
            UnlockNode::new("right", &["basics"], 80),
            UnlockNode::new("capstone", &["left", "right"], 100),
        ])
        .unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.dependents_of("basics"), vec!["left", "right"]);
        assert!(graph.dependents_of("capstone").is_empty());
    }

    #[test]
    fn counter_binding_percent_is_capped() {
        let binding = CounterBinding {
            key: "lessonsCompleted".into(),
            target: 8,
        };
        assert_eq!(binding.percent_for(2), 25);
        assert_eq!(binding.percent_for(40), 100);
    }
}
