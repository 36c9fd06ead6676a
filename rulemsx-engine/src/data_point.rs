//! Data points: named handles over a source.
//!
//! A data point owns its source and records which other data points it
//! depends on. It performs no caching of its own.

use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

use crate::error::{EngineError, EngineResult};
use crate::source::{DataPointSource, DataPointState};
use crate::value::Value;

/// Named value handle inside a data set.
///
/// # Invariants
/// - The source is bound at most once
/// - Dependencies never form a cycle
pub struct DataPoint {
    name: String,
    /// Name of the owning data set (non-owning back-reference)
    data_set: String,
    source: OnceLock<Box<dyn DataPointSource>>,
    dependencies: RwLock<Vec<Arc<DataPoint>>>,
    dependents: RwLock<Vec<Weak<DataPoint>>>,
}

impl DataPoint {
    pub(crate) fn new(name: impl Into<String>, data_set: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_set: data_set.into(),
            source: OnceLock::new(),
            dependencies: RwLock::new(Vec::new()),
            dependents: RwLock::new(Vec::new()),
        }
    }

    /// Name of this data point.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the data set this data point belongs to.
    pub fn data_set_name(&self) -> &str {
        &self.data_set
    }

    /// Bind the backing source.
    ///
    /// The source's inputs become dependencies of this data point.
    ///
    /// # Errors
    /// Returns `EngineError::SourceAlreadyBound` if a source is already bound,
    /// or `EngineError::DependencyCycle` if an input is this data point or
    /// depends on it. Nothing is bound on error.
    pub fn bind_source(
        self: &Arc<Self>,
        source: impl DataPointSource + 'static,
    ) -> EngineResult<()> {
        if self.has_source() {
            return Err(EngineError::SourceAlreadyBound(self.qualified_name()));
        }

        let inputs = source.inputs();
        if let Some(input) = inputs.iter().find(|i| self.would_cycle(i)) {
            return Err(EngineError::DependencyCycle {
                from: self.qualified_name(),
                to: input.qualified_name(),
            });
        }

        self.source
            .set(Box::new(source))
            .map_err(|_| EngineError::SourceAlreadyBound(self.qualified_name()))?;

        for input in &inputs {
            self.add_dependency(input)?;
        }
        Ok(())
    }

    /// Whether a source has been bound.
    pub fn has_source(&self) -> bool {
        self.source.get().is_some()
    }

    /// Current value of the bound source.
    ///
    /// # Errors
    /// Returns `EngineError::SourceUnavailable` if no source is bound, or
    /// whatever the source reports.
    pub fn value(&self) -> EngineResult<Value> {
        self.bound_source()?.value()
    }

    /// Staleness of the bound source. Unbound data points are STALE.
    pub fn state(&self) -> DataPointState {
        self.source
            .get()
            .map(|s| s.state())
            .unwrap_or(DataPointState::Stale)
    }

    /// Override the staleness of the bound source only.
    pub fn set_state(&self, state: DataPointState) {
        if let Some(source) = self.source.get() {
            source.set_state(state);
        }
    }

    /// Mark this data point STALE, along with everything that depends on it.
    ///
    /// This is the entry point for notification adapters. It only flips
    /// atomic flags, so it is safe to call from a feed delivery thread while
    /// an evaluation pass is reading the same data set.
    pub fn mark_stale(&self) {
        trace!(data_point = %self.name, data_set = %self.data_set, "Marking stale");
        self.set_state(DataPointState::Stale);

        let dependents: Vec<Arc<DataPoint>> = self
            .dependents
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        for dependent in dependents {
            dependent.mark_stale();
        }
    }

    /// Record that this data point's value is derived from `other`.
    ///
    /// Adding the same dependency twice is a no-op.
    ///
    /// # Errors
    /// Returns `EngineError::DependencyCycle` if `other` is this data point
    /// or already depends on it.
    pub fn add_dependency(self: &Arc<Self>, other: &Arc<DataPoint>) -> EngineResult<()> {
        if self.would_cycle(other) {
            return Err(EngineError::DependencyCycle {
                from: self.qualified_name(),
                to: other.qualified_name(),
            });
        }

        {
            let mut dependencies = self.dependencies.write();
            if dependencies.iter().any(|d| Arc::ptr_eq(d, other)) {
                return Ok(());
            }
            dependencies.push(other.clone());
        }

        other.dependents.write().push(Arc::downgrade(self));
        Ok(())
    }

    /// Direct dependencies, in the order they were added.
    pub fn dependencies(&self) -> Vec<Arc<DataPoint>> {
        self.dependencies.read().clone()
    }

    /// Names of the direct dependencies, in the order they were added.
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies
            .read()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    /// Whether `target` is reachable through this data point's dependencies.
    pub fn depends_on(&self, target: &DataPoint) -> bool {
        self.dependencies
            .read()
            .iter()
            .any(|d| std::ptr::eq(Arc::as_ptr(d), target) || d.depends_on(target))
    }

    fn would_cycle(&self, other: &Arc<DataPoint>) -> bool {
        std::ptr::eq(Arc::as_ptr(other), self) || other.depends_on(self)
    }

    fn bound_source(&self) -> EngineResult<&dyn DataPointSource> {
        self.source.get().map(|s| s.as_ref()).ok_or_else(|| {
            EngineError::SourceUnavailable(format!("no source bound to {}", self.qualified_name()))
        })
    }

    fn qualified_name(&self) -> String {
        format!("{}.{}", self.data_set, self.name)
    }
}

impl fmt::Debug for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPoint")
            .field("name", &self.name)
            .field("data_set", &self.data_set)
            .field("bound", &self.has_source())
            .field("state", &self.state())
            .field("dependencies", &self.dependency_names())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
