//! Rules, evaluators and actions.

use std::fmt;

use crate::data_set::DataSet;
use crate::error::EngineResult;

/// Boolean predicate over a data set.
pub trait RuleEvaluator: Send + Sync {
    /// Evaluate against a data set.
    ///
    /// A missing data point or a type error should be returned as an error,
    /// not folded into `false`.
    fn evaluate(&self, data_set: &DataSet) -> EngineResult<bool>;

    /// Names of the data points this evaluator reads.
    ///
    /// Declarative only; used for impact analysis, not enforced.
    fn dependencies(&self) -> Vec<String>;
}

/// Side effect fired when a rule's evaluator passes.
///
/// Actions treat the data set as read-only and resolve any identifiers they
/// need through `DataSet::value_of`.
pub trait RuleAction: Send + Sync {
    /// Execute against a data set.
    fn execute(&self, data_set: &DataSet) -> EngineResult<()>;
}

impl<F> RuleAction for F
where
    F: Fn(&DataSet) -> EngineResult<()> + Send + Sync,
{
    fn execute(&self, data_set: &DataSet) -> EngineResult<()> {
        self(data_set)
    }
}

/// A named evaluator with the actions it fires.
///
/// Children are attached through `RuleSet::add_child_rule`.
pub struct Rule {
    name: String,
    evaluator: Box<dyn RuleEvaluator>,
    actions: Vec<Box<dyn RuleAction>>,
}

impl Rule {
    /// Create a rule with no actions.
    pub fn new(name: impl Into<String>, evaluator: impl RuleEvaluator + 'static) -> Self {
        Self {
            name: name.into(),
            evaluator: Box::new(evaluator),
            actions: Vec::new(),
        }
    }

    /// Append an action (builder style).
    pub fn with_action(mut self, action: impl RuleAction + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    /// Append an action.
    pub fn add_action(&mut self, action: impl RuleAction + 'static) {
        self.actions.push(Box::new(action));
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule's evaluator.
    pub fn evaluator(&self) -> &dyn RuleEvaluator {
        self.evaluator.as_ref()
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> &[Box<dyn RuleAction>] {
        &self.actions
    }

    /// Data points declared by the evaluator.
    pub fn dependencies(&self) -> Vec<String> {
        self.evaluator.dependencies()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies())
            .field("actions", &self.actions.len())
            .finish()
    }
}
