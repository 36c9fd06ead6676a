//! Rule sets: the alpha/beta rule tree and its evaluation pass.
//!
//! Rules live in an arena owned by the rule set. Alpha rules hang off the
//! rule set itself and are always attempted; beta rules hang off another
//! rule and are attempted only when their parent's evaluator passed.
//!
//! # Pass
//!
//! ```text
//! for alpha in declaration order:
//!     visit(alpha)
//!
//! visit(rule):
//!     evaluator false → prune subtree
//!     evaluator true  → run actions in order → visit(children) in order
//!     error           → record failure, abort this branch only
//! ```

use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

use crate::data_set::DataSet;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::report::{EvaluationReport, RuleOutcome};
use crate::rule::Rule;

static NEXT_RULE_SET: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a rule inside its rule set.
///
/// Handles are only valid in the rule set that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId {
    rule_set: u64,
    index: usize,
}

#[derive(Debug)]
struct RuleNode {
    rule: Rule,
    parent: Option<RuleId>,
    children: Vec<RuleId>,
}

/// Named, ordered tree of rules.
#[derive(Debug)]
pub struct RuleSet {
    id: u64,
    name: String,
    nodes: Vec<RuleNode>,
    alpha: Vec<RuleId>,
    index: HashMap<String, RuleId>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_RULE_SET.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            nodes: Vec::new(),
            alpha: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Name of this rule set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an alpha rule (parent is the rule set).
    ///
    /// # Errors
    /// Returns `EngineError::DuplicateName` if a rule with the same name
    /// exists anywhere in the tree.
    pub fn add_rule(&mut self, rule: Rule) -> EngineResult<RuleId> {
        let id = self.insert(rule, None)?;
        self.alpha.push(id);
        Ok(id)
    }

    /// Add a beta rule under `parent`.
    ///
    /// # Errors
    /// Returns `EngineError::NotFound` if `parent` does not belong to this
    /// rule set, or `EngineError::DuplicateName` on a name clash.
    pub fn add_child_rule(&mut self, parent: RuleId, rule: Rule) -> EngineResult<RuleId> {
        if self.node(parent).is_none() {
            return Err(EngineError::not_found(
                EntityKind::Rule,
                format!("#{} in {}", parent.index, self.name),
            ));
        }

        let id = self.insert(rule, Some(parent))?;
        self.nodes[parent.index].children.push(id);
        Ok(id)
    }

    fn node(&self, id: RuleId) -> Option<&RuleNode> {
        if id.rule_set != self.id {
            return None;
        }
        self.nodes.get(id.index)
    }

    fn insert(&mut self, rule: Rule, parent: Option<RuleId>) -> EngineResult<RuleId> {
        if self.index.contains_key(rule.name()) {
            return Err(EngineError::duplicate(EntityKind::Rule, rule.name()));
        }

        let id = RuleId {
            rule_set: self.id,
            index: self.nodes.len(),
        };
        self.index.insert(rule.name().to_string(), id);
        self.nodes.push(RuleNode {
            rule,
            parent,
            children: Vec::new(),
        });
        Ok(id)
    }

    /// Look up a rule's handle by name.
    pub fn rule_id(&self, name: &str) -> EngineResult<RuleId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::not_found(EntityKind::Rule, name))
    }

    /// Look up a rule by name.
    pub fn rule(&self, name: &str) -> EngineResult<&Rule> {
        let id = self.rule_id(name)?;
        Ok(&self.nodes[id.index].rule)
    }

    /// Rule behind a handle.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.node(id).map(|n| &n.rule)
    }

    /// Parent of a rule; `None` for alpha rules.
    pub fn parent(&self, id: RuleId) -> Option<RuleId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children of a rule, in declaration order.
    pub fn children(&self, id: RuleId) -> &[RuleId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Alpha rules, in declaration order.
    pub fn alpha_rules(&self) -> &[RuleId] {
        &self.alpha
    }

    /// Whether the rule's parent is the rule set itself.
    pub fn is_alpha(&self, id: RuleId) -> bool {
        self.node(id).map(|n| n.parent.is_none()).unwrap_or(false)
    }

    /// Total number of rules in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every data point name declared by any evaluator, first-seen order.
    pub fn dependencies(&self) -> IndexSet<String> {
        self.nodes
            .iter()
            .flat_map(|n| n.rule.dependencies())
            .collect()
    }

    /// Rules whose evaluator declares `data_point` as a dependency.
    pub fn rules_reading(&self, data_point: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.rule.dependencies().iter().any(|d| d == data_point))
            .map(|n| n.rule.name())
            .collect()
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Run one evaluation pass of `data_set` over the tree.
    ///
    /// Never fails as a whole: errors are caught at the rule that raised
    /// them, logged, and recorded in the report.
    pub fn execute(&self, data_set: &DataSet) -> EvaluationReport {
        let start = Instant::now();
        let mut report = EvaluationReport::new(&self.name, data_set.name());

        debug!(
            rule_set = %self.name,
            data_set = %data_set.name(),
            alpha_rules = self.alpha.len(),
            "Starting evaluation pass"
        );

        for &id in &self.alpha {
            self.visit(id, 0, data_set, &mut report);
        }

        report.elapsed = start.elapsed();

        debug!(
            rule_set = %self.name,
            data_set = %data_set.name(),
            fired = report.fired_rules().len(),
            failures = report.failures().len(),
            "Evaluation pass complete"
        );

        report
    }

    fn visit(&self, id: RuleId, depth: usize, data_set: &DataSet, report: &mut EvaluationReport) {
        let node = &self.nodes[id.index];
        let rule = &node.rule;

        match Self::fire(rule, data_set) {
            Ok(Some(actions)) => {
                debug!(rule = %rule.name(), data_set = %data_set.name(), actions, "Rule fired");
                report.record(rule.name(), depth, RuleOutcome::Fired { actions });

                for &child in &node.children {
                    self.visit(child, depth + 1, data_set, report);
                }
            },
            Ok(None) => {
                debug!(
                    rule = %rule.name(),
                    data_set = %data_set.name(),
                    pruned = node.children.len(),
                    "Rule not matched"
                );
                report.record(rule.name(), depth, RuleOutcome::NotMatched);
            },
            Err(cause) => {
                let error = EngineError::evaluation_failure(rule.name(), data_set.name(), cause);
                warn!(
                    rule = %rule.name(),
                    data_set = %data_set.name(),
                    error = %error,
                    "Rule branch aborted"
                );
                report.record(rule.name(), depth, RuleOutcome::Failed(error));
            },
        }
    }

    /// Evaluate and, on a match, run the actions. Returns the action count,
    /// or `None` if the evaluator returned false.
    fn fire(rule: &Rule, data_set: &DataSet) -> EngineResult<Option<usize>> {
        if !rule.evaluator().evaluate(data_set)? {
            return Ok(None);
        }

        for action in rule.actions() {
            action.execute(data_set)?;
        }

        Ok(Some(rule.actions().len()))
    }
}

// =============================================================================
// Tests
// =============================================================================
