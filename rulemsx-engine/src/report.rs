//! Evaluation pass reports.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::EngineError;

/// Outcome of visiting a single rule during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Evaluator passed; all actions ran and children were attempted
    Fired {
        /// Number of actions executed
        actions: usize,
    },
    /// Evaluator returned false; actions skipped and subtree pruned
    NotMatched,
    /// Evaluator or an action failed; the rest of the branch was aborted
    Failed(EngineError),
}

/// A rule visited during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVisit {
    /// Rule name
    pub rule: String,
    /// 0 for alpha rules, parent depth + 1 for beta rules
    pub depth: usize,
    /// What happened
    pub outcome: RuleOutcome,
}

/// Result of one (rule set, data set) evaluation pass.
///
/// Visits are recorded in depth-first order. Pruned rules are not visited
/// and do not appear.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Rule set that was executed
    pub rule_set: String,
    /// Data set that was evaluated
    pub data_set: String,
    /// Rules visited, in evaluation order
    pub visits: Vec<RuleVisit>,
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// How long the pass took
    pub elapsed: Duration,
}

impl EvaluationReport {
    pub(crate) fn new(rule_set: impl Into<String>, data_set: impl Into<String>) -> Self {
        Self {
            rule_set: rule_set.into(),
            data_set: data_set.into(),
            visits: Vec::new(),
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, rule: &str, depth: usize, outcome: RuleOutcome) {
        self.visits.push(RuleVisit {
            rule: rule.to_string(),
            depth,
            outcome,
        });
    }

    /// Names of rules whose evaluator passed and whose actions all ran.
    pub fn fired_rules(&self) -> Vec<&str> {
        self.visits
            .iter()
            .filter(|v| matches!(v.outcome, RuleOutcome::Fired { .. }))
            .map(|v| v.rule.as_str())
            .collect()
    }

    /// Names of every rule that was attempted, in order.
    pub fn attempted_rules(&self) -> Vec<&str> {
        self.visits.iter().map(|v| v.rule.as_str()).collect()
    }

    /// Outcome for a rule, or `None` if it was pruned.
    pub fn outcome_of(&self, rule: &str) -> Option<&RuleOutcome> {
        self.visits
            .iter()
            .find(|v| v.rule == rule)
            .map(|v| &v.outcome)
    }

    /// Errors raised during the pass, each an `EngineError::EvaluationFailure`.
    pub fn failures(&self) -> Vec<&EngineError> {
        self.visits
            .iter()
            .filter_map(|v| match &v.outcome {
                RuleOutcome::Failed(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Whether any rule failed.
    pub fn has_failures(&self) -> bool {
        self.visits
            .iter()
            .any(|v| matches!(v.outcome, RuleOutcome::Failed(_)))
    }

    /// Total number of actions executed.
    pub fn actions_executed(&self) -> usize {
        self.visits
            .iter()
            .map(|v| match v.outcome {
                RuleOutcome::Fired { actions } => actions,
                _ => 0,
            })
            .sum()
    }
}
