//! Data sets: one evaluation subject's data points.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::data_point::DataPoint;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::source::DataPointState;
use crate::value::Value;

/// Named collection of data points evaluated together (e.g. one order).
///
/// Iteration follows insertion order. Rules never keep references to a
/// data set between passes, so it can be dropped at any time.
#[derive(Debug)]
pub struct DataSet {
    name: String,
    points: IndexMap<String, Arc<DataPoint>>,
}

impl DataSet {
    /// Create an empty data set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: IndexMap::new(),
        }
    }

    /// Name of this data set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create and register a new data point.
    ///
    /// The returned handle is used to bind a source and add dependencies.
    ///
    /// # Errors
    /// Returns `EngineError::DuplicateName` if the name is already taken.
    pub fn add_data_point(&mut self, name: impl Into<String>) -> EngineResult<Arc<DataPoint>> {
        let name = name.into();
        if self.points.contains_key(&name) {
            return Err(EngineError::duplicate(EntityKind::DataPoint, name));
        }

        let data_point = Arc::new(DataPoint::new(name.clone(), self.name.clone()));
        self.points.insert(name, data_point.clone());
        Ok(data_point)
    }

    /// Look up a data point by exact name.
    ///
    /// # Errors
    /// Returns `EngineError::NotFound` if absent.
    pub fn data_point(&self, name: &str) -> EngineResult<&Arc<DataPoint>> {
        self.points
            .get(name)
            .ok_or_else(|| EngineError::not_found(EntityKind::DataPoint, name))
    }

    /// Shorthand for `data_point(name)?.value()`.
    pub fn value_of(&self, name: &str) -> EngineResult<Value> {
        self.data_point(name)?.value()
    }

    /// Whether a data point with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.points.contains_key(name)
    }

    /// Data points in insertion order.
    pub fn data_points(&self) -> impl Iterator<Item = &Arc<DataPoint>> {
        self.points.values()
    }

    /// Names of data points currently STALE.
    pub fn stale_data_points(&self) -> Vec<&str> {
        self.points
            .values()
            .filter(|dp| dp.state() == DataPointState::Stale)
            .map(|dp| dp.name())
            .collect()
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the data set has no data points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
