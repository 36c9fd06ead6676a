//! Top-level registry of rule sets and data sets.

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::data_set::DataSet;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::report::EvaluationReport;
use crate::rule_set::RuleSet;

/// Registry owning named rule sets and data sets.
///
/// Explicitly scoped: create one per host. Nothing is removed unless the
/// caller asks for it.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rule_sets: IndexMap<String, RuleSet>,
    data_sets: IndexMap<String, DataSet>,
}

impl RuleEngine {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Rule sets
    // =========================================================================

    /// Create a rule set.
    ///
    /// # Errors
    /// Returns `EngineError::DuplicateName` if the name is taken.
    pub fn create_rule_set(&mut self, name: impl Into<String>) -> EngineResult<&mut RuleSet> {
        let name = name.into();
        match self.rule_sets.entry(name) {
            Entry::Occupied(e) => Err(EngineError::duplicate(EntityKind::RuleSet, e.key().clone())),
            Entry::Vacant(e) => {
                info!(rule_set = %e.key(), "Rule set created");
                let rule_set = RuleSet::new(e.key().clone());
                Ok(e.insert(rule_set))
            },
        }
    }

    /// Look up a rule set.
    pub fn rule_set(&self, name: &str) -> EngineResult<&RuleSet> {
        self.rule_sets
            .get(name)
            .ok_or_else(|| EngineError::not_found(EntityKind::RuleSet, name))
    }

    /// Look up a rule set for modification.
    pub fn rule_set_mut(&mut self, name: &str) -> EngineResult<&mut RuleSet> {
        self.rule_sets
            .get_mut(name)
            .ok_or_else(|| EngineError::not_found(EntityKind::RuleSet, name))
    }

    /// Rule sets in creation order.
    pub fn rule_sets(&self) -> impl Iterator<Item = &RuleSet> {
        self.rule_sets.values()
    }

    // =========================================================================
    // Data sets
    // =========================================================================

    /// Create a data set.
    ///
    /// # Errors
    /// Returns `EngineError::DuplicateName` if the name is taken.
    pub fn create_data_set(&mut self, name: impl Into<String>) -> EngineResult<&mut DataSet> {
        let name = name.into();
        match self.data_sets.entry(name) {
            Entry::Occupied(e) => Err(EngineError::duplicate(EntityKind::DataSet, e.key().clone())),
            Entry::Vacant(e) => {
                info!(data_set = %e.key(), "Data set created");
                let data_set = DataSet::new(e.key().clone());
                Ok(e.insert(data_set))
            },
        }
    }

    /// Look up a data set.
    pub fn data_set(&self, name: &str) -> EngineResult<&DataSet> {
        self.data_sets
            .get(name)
            .ok_or_else(|| EngineError::not_found(EntityKind::DataSet, name))
    }

    /// Look up a data set for modification.
    pub fn data_set_mut(&mut self, name: &str) -> EngineResult<&mut DataSet> {
        self.data_sets
            .get_mut(name)
            .ok_or_else(|| EngineError::not_found(EntityKind::DataSet, name))
    }

    /// Data sets in creation order.
    pub fn data_sets(&self) -> impl Iterator<Item = &DataSet> {
        self.data_sets.values()
    }

    /// Number of registered data sets.
    pub fn data_set_count(&self) -> usize {
        self.data_sets.len()
    }

    /// Remove a data set whose subject is finished (e.g. a filled order).
    ///
    /// Order of the remaining data sets is preserved.
    pub fn remove_data_set(&mut self, name: &str) -> EngineResult<DataSet> {
        let removed = self
            .data_sets
            .shift_remove(name)
            .ok_or_else(|| EngineError::not_found(EntityKind::DataSet, name))?;
        info!(data_set = %name, "Data set removed");
        Ok(removed)
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Run one pass of a data set over a rule set.
    ///
    /// # Errors
    /// Only lookup failures; rule failures are recorded in the report.
    pub fn execute(&self, rule_set: &str, data_set: &str) -> EngineResult<EvaluationReport> {
        let rules = self.rule_set(rule_set)?;
        let data = self.data_set(data_set)?;
        Ok(rules.execute(data))
    }

    /// Run every data set over a rule set, in creation order.
    ///
    /// A failing rule in one data set's pass never stops the others.
    pub fn execute_all(&self, rule_set: &str) -> EngineResult<Vec<EvaluationReport>> {
        let rules = self.rule_set(rule_set)?;
        debug!(rule_set = %rule_set, data_sets = self.data_sets.len(), "Executing all data sets");
        Ok(self.data_sets.values().map(|ds| rules.execute(ds)).collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_rejected() {
        let mut engine = RuleEngine::new();
        engine.create_rule_set("TestRules").unwrap();
        engine.create_data_set("RMSXTest1").unwrap();

        assert_eq!(
            engine.create_rule_set("TestRules").unwrap_err(),
            EngineError::duplicate(EntityKind::RuleSet, "TestRules")
        );
        assert_eq!(
            engine.create_data_set("RMSXTest1").unwrap_err(),
            EngineError::duplicate(EntityKind::DataSet, "RMSXTest1")
        );
    }

    #[test]
    fn test_lookup_not_found() {
        let mut engine = RuleEngine::new();

        assert!(matches!(
            engine.rule_set("Nope"),
            Err(EngineError::NotFound { kind: EntityKind::RuleSet, .. })
        ));
        assert!(matches!(
            engine.data_set_mut("Nope"),
            Err(EngineError::NotFound { kind: EntityKind::DataSet, .. })
        ));
        assert!(engine.execute("Nope", "Nope").is_err());
    }

    #[test]
    fn test_data_sets_in_creation_order_after_removal() {
        let mut engine = RuleEngine::new();
        for name in ["RMSXTest1", "RMSXTest2", "RMSXTest3"] {
            engine.create_data_set(name).unwrap();
        }

        let removed = engine.remove_data_set("RMSXTest2").unwrap();
        assert_eq!(removed.name(), "RMSXTest2");

        let names: Vec<&str> = engine.data_sets().map(|ds| ds.name()).collect();
        assert_eq!(names, vec!["RMSXTest1", "RMSXTest3"]);
        assert_eq!(engine.data_set_count(), 2);
    }
}
