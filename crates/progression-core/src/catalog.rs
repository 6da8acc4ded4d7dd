//! Catalog data: counters, achievements, the unlock graph and item banks.
//!
//! Loaded once at startup from TOML or JSON and validated in full before
//! any learner is enrolled. A rejected catalog is logged and returned as a
//! [`CatalogError`]; nothing downstream re-checks it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::CatalogError;
use crate::exercise::ItemBank;
use crate::progress::{AchievementDefinition, CounterDefinition};
use crate::unlock::{UnlockGraph, UnlockNode};

const BUILTIN_CATALOG: &str = include_str!("../catalog/default.toml");

/// On-disk shape of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub counters: Vec<CounterDefinition>,
    #[serde(default)]
    pub achievements: Vec<AchievementDefinition>,
    #[serde(default)]
    pub nodes: Vec<UnlockNode>,
    #[serde(default)]
    pub banks: Vec<ItemBank>,
}

/// Validated, immutable catalog shared by all learners.
#[derive(Debug, Clone)]
pub struct Catalog {
    counters: Arc<[CounterDefinition]>,
    achievements: Arc<[AchievementDefinition]>,
    graph: Arc<UnlockGraph>,
    banks: Arc<[ItemBank]>,
}

impl Catalog {
    pub fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        match Self::validate(document) {
            Ok(catalog) => {
                tracing::info!(
                    counters = catalog.counters.len(),
                    achievements = catalog.achievements.len(),
                    nodes = catalog.graph.len(),
                    banks = catalog.banks.len(),
                    "catalog loaded"
                );
                Ok(catalog)
            }
            Err(err) => {
                tracing::error!(error = %err, "catalog rejected");
                Err(err)
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = toml::from_str(content)?;
        Self::from_document(document)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(content)?;
        Self::from_document(document)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    fn validate(document: CatalogDocument) -> Result<Self, CatalogError> {
        let CatalogDocument {
            counters,
            achievements,
            nodes,
            banks,
        } = document;

        let mut counter_keys = HashSet::new();
        for counter in &counters {
            if !counter_keys.insert(counter.key.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "counter",
                    id: counter.key.clone(),
                });
            }
        }

        let mut achievement_ids = HashSet::new();
        for def in &achievements {
            if !achievement_ids.insert(def.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "achievement",
                    id: def.id.clone(),
                });
            }
            if def.points == 0 {
                return Err(invalid(&def.id, "points must be greater than zero"));
            }
            if def.requirement == 0 {
                return Err(invalid(&def.id, "requirement must be greater than zero"));
            }
            if !counter_keys.contains(def.counter_key.as_str()) {
                return Err(CatalogError::UnknownCounter {
                    counter: def.counter_key.clone(),
                    referenced_by: def.id.clone(),
                });
            }
        }

        for node in &nodes {
            if let Some(binding) = &node.counter {
                if !counter_keys.contains(binding.key.as_str()) {
                    return Err(CatalogError::UnknownCounter {
                        counter: binding.key.clone(),
                        referenced_by: node.id.clone(),
                    });
                }
            }
        }
        let graph = UnlockGraph::new(nodes)?;

        let mut bank_ids = HashSet::new();
        for bank in &banks {
            if !bank_ids.insert(bank.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "bank",
                    id: bank.id.clone(),
                });
            }
            let mut item_ids = HashSet::new();
            for item in &bank.items {
                if item.id.trim().is_empty() {
                    return Err(invalid(&bank.id, "item with an empty id"));
                }
                if !item_ids.insert(item.id.as_str()) {
                    return Err(CatalogError::DuplicateId {
                        kind: "item",
                        id: format!("{}/{}", bank.id, item.id),
                    });
                }
                let has_options = item.options.as_ref().is_some_and(|o| !o.is_empty());
                if item.item_type.needs_options() && !has_options {
                    return Err(invalid(&item.id, "multiple choice item without options"));
                }
            }
        }

        Ok(Self {
            counters: counters.into(),
            achievements: achievements.into(),
            graph: Arc::new(graph),
            banks: banks.into(),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn counters(&self) -> &[CounterDefinition] {
        &self.counters
    }

    pub fn achievements(&self) -> &Arc<[AchievementDefinition]> {
        &self.achievements
    }

    pub fn achievement(&self, id: &str) -> Option<&AchievementDefinition> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn graph(&self) -> &Arc<UnlockGraph> {
        &self.graph
    }

    pub fn banks(&self) -> &[ItemBank] {
        &self.banks
    }

    pub fn bank(&self, id: &str) -> Option<&ItemBank> {
        self.banks.iter().find(|b| b.id == id)
    }

    /// Back to the serializable form, e.g. for `catalog show --json`.
    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            counters: self.counters.to_vec(),
            achievements: self.achievements.to_vec(),
            nodes: self.graph.nodes().to_vec(),
            banks: self.banks.to_vec(),
        }
    }
}

fn invalid(id: &str, message: &str) -> CatalogError {
    CatalogError::InvalidDefinition {
        id: id.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.achievement("week-streak").is_some());
        assert_eq!(catalog.graph().len(), 7);
        assert_eq!(catalog.bank("arithmetic-warmup").unwrap().items.len(), 4);
    }

    #[test]
    fn rejects_achievement_on_undeclared_counter() {
        let err = Catalog::from_toml_str(indoc! {r#"
            [[achievements]]
            id = "ghost-hunter"
            category = "learning"
            tier = "bronze"
            points = 5
            counter_key = "ghostsSeen"
            requirement = 1
        "#})
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownCounter { counter, referenced_by }
                if counter == "ghostsSeen" && referenced_by == "ghost-hunter"
        ));
    }

    #[test]
    fn rejects_cycle_through_toml() {
        let err = Catalog::from_toml_str(indoc! {r#"
            [[nodes]]
            id = "a"
            prerequisites = ["c"]
            completion_threshold = 50

            [[nodes]]
            id = "b"
            prerequisites = ["a"]
            completion_threshold = 50

            [[nodes]]
            id = "c"
            prerequisites = ["b"]
            completion_threshold = 50
        "#})
        .unwrap_err();
        assert!(matches!(err, CatalogError::CyclicPrerequisite { .. }));
    }

    #[test]
    fn rejects_zero_points_and_requirement() {
        let base = indoc! {r#"
            [[counters]]
            key = "lessonsCompleted"

            [[achievements]]
            id = "broken"
            category = "learning"
            tier = "bronze"
            counter_key = "lessonsCompleted"
        "#};
        let zero_points = format!("{base}points = 0\nrequirement = 1\n");
        let zero_req = format!("{base}points = 1\nrequirement = 0\n");
        assert!(matches!(
            Catalog::from_toml_str(&zero_points),
            Err(CatalogError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            Catalog::from_toml_str(&zero_req),
            Err(CatalogError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn rejects_choice_item_without_options() {
        let err = Catalog::from_toml_str(indoc! {r#"
            [[banks]]
            id = "quiz"

            [[banks.items]]
            id = "q1"
            type = "multiple_choice"
            question = "Pick one"
            correct_answer = "a"
        "#})
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidDefinition { id, .. } if id == "q1"));
    }

    #[test]
    fn loads_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let json = serde_json::to_string(&Catalog::builtin().unwrap().to_document()).unwrap();
        std::fs::write(&path, json).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.achievements().len(), 10);
        assert_eq!(catalog.counters().len(), 6);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Catalog::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
