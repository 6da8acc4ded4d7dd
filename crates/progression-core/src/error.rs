//! Core error types for progression-core.
//!
//! Errors fall into three families:
//!
//! - **Validation** errors reject a catalog or a command outright and are
//!   never retried (`EmptySession`, `UnknownCounter`, `UnknownNode`,
//!   `CyclicPrerequisite`, ...).
//! - **Resource** errors are expected business conditions surfaced to the
//!   learner (`InsufficientEnergy`, `SessionAlreadyActive`).
//! - **Consistency** errors mean the in-memory graph or state store is
//!   corrupt and initialization should halt.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Resource,
    Consistency,
}

/// Core error type for progression-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Spend request larger than the current balance
    #[error("Insufficient energy: requested {requested}, balance is {balance}")]
    InsufficientEnergy { requested: u32, balance: u32 },

    /// A learner already has an open exercise session
    #[error("Learner '{learner_id}' already has an active session ({session_id})")]
    SessionAlreadyActive {
        learner_id: String,
        session_id: String,
    },

    #[error("Cannot start an exercise session without items")]
    EmptySession,

    #[error("Unknown progress counter: {0}")]
    UnknownCounter(String),

    #[error("Unknown unlock node: {0}")]
    UnknownNode(String),

    #[error("Unknown learner: {0}")]
    UnknownLearner(String),

    #[error("Learner already enrolled: {0}")]
    LearnerAlreadyEnrolled(String),

    #[error("Unknown exercise session: {0}")]
    UnknownSession(String),

    #[error("Unknown item bank: {0}")]
    UnknownBank(String),

    /// Command not permitted in the session's current state
    #[error("Cannot {action} while session is {state}")]
    InvalidTransition { state: String, action: String },

    /// Negative delta applied to a counter that is not resettable
    #[error("Counter '{counter}' is cumulative and cannot take delta {delta}")]
    NegativeDelta { counter: String, delta: i64 },

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Unlock graph is inconsistent: {0}")]
    InconsistentGraph(String),

    #[error("Learner state lock was poisoned")]
    StatePoisoned,

    /// Catalog loading or validation failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InsufficientEnergy { .. } | CoreError::SessionAlreadyActive { .. } => {
                ErrorKind::Resource
            }
            CoreError::InconsistentGraph(_) | CoreError::StatePoisoned => ErrorKind::Consistency,
            _ => ErrorKind::Validation,
        }
    }

    /// Whether the caller can reasonably show this to a learner and carry on.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Resource
    }
}

/// Catalog-specific errors. All of these are fatal at load time.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The prerequisite relation contains a cycle
    #[error("Cyclic prerequisite: {}", cycle.join(" -> "))]
    CyclicPrerequisite { cycle: Vec<String> },

    #[error("Node '{referenced_by}' references undefined node '{node}'")]
    UnknownNode { node: String, referenced_by: String },

    #[error("'{referenced_by}' references undefined counter '{counter}'")]
    UnknownCounter {
        counter: String,
        referenced_by: String,
    },

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Invalid definition '{id}': {message}")]
    InvalidDefinition { id: String, message: String },

    #[error("Failed to parse catalog: {0}")]
    Parse(String),

    #[error("Failed to read catalog at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Failed to resolve data directory: {0}")]
    DataDir(String),
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CoreError::StatePoisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_errors_are_recoverable() {
        let err = CoreError::InsufficientEnergy {
            requested: 50,
            balance: 40,
        };
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.is_recoverable());
    }

    #[test]
    fn catalog_errors_are_validation() {
        let err: CoreError = CatalogError::CyclicPrerequisite {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Catalog error: Cyclic prerequisite: a -> b -> a"
        );
    }

    #[test]
    fn poisoned_lock_is_consistency_error() {
        assert_eq!(CoreError::StatePoisoned.kind(), ErrorKind::Consistency);
        assert!(!CoreError::StatePoisoned.is_recoverable());
    }
}
