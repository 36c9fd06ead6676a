//! Engine error types.

use std::fmt;
use thiserror::Error;

/// Kind of named entity, used to qualify lookup and naming errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A data point inside a data set
    DataPoint,
    /// A data set registered with the engine
    DataSet,
    /// A rule inside a rule set
    Rule,
    /// A rule set registered with the engine
    RuleSet,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::DataPoint => write!(f, "data point"),
            EntityKind::DataSet => write!(f, "data set"),
            EntityKind::Rule => write!(f, "rule"),
            EntityKind::RuleSet => write!(f, "rule set"),
        }
    }
}

/// Errors that can occur in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An entity with this name already exists in its scope
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName {
        /// Kind of entity being created
        kind: EntityKind,
        /// The conflicting name
        name: String,
    },

    /// No entity with this name exists in its scope
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Kind of entity being looked up
        kind: EntityKind,
        /// The missing name
        name: String,
    },

    /// An evaluator or action failed while a rule was being evaluated
    #[error("Evaluation failure in rule '{rule}' on data set '{data_set}': {source}")]
    EvaluationFailure {
        /// Rule whose branch was aborted
        rule: String,
        /// Data set being evaluated
        data_set: String,
        /// Underlying cause
        #[source]
        source: Box<EngineError>,
    },

    /// A source cannot produce a value (no source bound, pending fetch, no tick yet)
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A data point already has a source bound
    #[error("Source already bound to data point: {0}")]
    SourceAlreadyBound(String),

    /// Adding the dependency would create a cycle
    #[error("Dependency cycle: '{from}' cannot depend on '{to}'")]
    DependencyCycle {
        /// Data point the dependency was being added to
        from: String,
        /// Data point that was being added as a dependency
        to: String,
    },

    /// A value could not be converted to the requested type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Requested type
        expected: String,
        /// Actual value type
        actual: String,
    },

    /// An action could not complete its side effect
    #[error("Action failed: {0}")]
    Action(String),
}

impl EngineError {
    /// Create a not found error
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a duplicate name error
    pub fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Wrap an error raised inside a rule's branch.
    pub fn evaluation_failure(
        rule: impl Into<String>,
        data_set: impl Into<String>,
        source: EngineError,
    ) -> Self {
        Self::EvaluationFailure {
            rule: rule.into(),
            data_set: data_set.into(),
            source: Box::new(source),
        }
    }

    /// The innermost cause, unwrapping evaluation failures.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            Self::EvaluationFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Tests
// =============================================================================
