//! RuleMSX Engine Layer
//!
//! Reactive rule evaluation over lazily computed, staleness-tracked data.
//! No I/O: feeds and actions plug in through traits.
//!
//! # Architecture
//!
//! ```text
//! Feed notification → DataPoint::mark_stale → (next read) Source recompute
//!                                                  ↓
//! RuleEngine → RuleSet::execute(DataSet) → Evaluator → Actions → Child rules
//! ```
//!
//! # Components
//!
//! - **Sources**: value producers with a staleness flag (`ConstantSource`,
//!   `ComputedSource`, `CompoundSource`, or caller-supplied)
//! - **DataPoint / DataSet**: named handles grouped per evaluation subject
//! - **Rule / RuleSet**: alpha/beta rule tree stored as an arena
//! - **RuleEngine**: registry of named rule sets and data sets
//!
//! # Example
//!
//! ```rust
//! use rulemsx_engine::{
//!     ConstantSource, DataSet, EngineResult, Rule, RuleEngine, RuleEvaluator,
//! };
//!
//! struct IsUs;
//!
//! impl RuleEvaluator for IsUs {
//!     fn evaluate(&self, data_set: &DataSet) -> EngineResult<bool> {
//!         Ok(data_set.value_of("Exchange")?.matches_text("US"))
//!     }
//!
//!     fn dependencies(&self) -> Vec<String> {
//!         vec!["Exchange".to_string()]
//!     }
//! }
//!
//! let mut engine = RuleEngine::new();
//! let data_set = engine.create_data_set("Order1").unwrap();
//! let exchange = data_set.add_data_point("Exchange").unwrap();
//! exchange.bind_source(ConstantSource::new("US")).unwrap();
//!
//! let rules = engine.create_rule_set("Routing").unwrap();
//! rules.add_rule(Rule::new("IsUS", IsUs)).unwrap();
//!
//! let report = engine.execute("Routing", "Order1").unwrap();
//! assert_eq!(report.fired_rules(), vec!["IsUS"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod data_point;
pub mod data_set;
pub mod error;
pub mod registry;
pub mod report;
pub mod rule;
pub mod rule_set;
pub mod source;
pub mod value;

// Re-exports for convenience
pub use data_point::DataPoint;
pub use data_set::DataSet;
pub use error::{EngineError, EngineResult, EntityKind};
pub use registry::RuleEngine;
pub use report::{EvaluationReport, RuleOutcome, RuleVisit};
pub use rule::{Rule, RuleAction, RuleEvaluator};
pub use rule_set::{RuleId, RuleSet};
pub use source::{
    CompoundSource, ComputedSource, ConstantSource, DataPointSource, DataPointState, StaleFlag,
};
pub use value::Value;
