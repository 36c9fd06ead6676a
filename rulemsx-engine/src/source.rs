//! Data point sources.
//!
//! A source produces a single value on demand and tracks whether its cached
//! value is current. All caching and staleness lives here; `DataPoint` only
//! delegates.
//!
//! Notification threads only ever flip the atomic `StaleFlag`. Recomputation
//! happens on the reading thread, under the source's own cache lock.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::data_point::DataPoint;
use crate::error::{EngineError, EngineResult};
use crate::value::Value;

// =============================================================================
// State
// =============================================================================

/// Staleness of a source's cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataPointState {
    /// Cached value needs recomputation (or refresh) before it can be trusted
    Stale,
    /// Cached value is consistent with the underlying data
    Current,
}

impl fmt::Display for DataPointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataPointState::Stale => write!(f, "STALE"),
            DataPointState::Current => write!(f, "CURRENT"),
        }
    }
}

/// Atomic staleness flag.
///
/// Safe to flip from any thread while another thread is reading the source.
#[derive(Debug)]
pub struct StaleFlag(AtomicBool);

impl StaleFlag {
    /// A flag in the STALE state.
    pub fn stale() -> Self {
        Self(AtomicBool::new(true))
    }

    /// A flag in the CURRENT state.
    pub fn current() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Current state of the flag.
    pub fn state(&self) -> DataPointState {
        if self.0.load(Ordering::Acquire) {
            DataPointState::Stale
        } else {
            DataPointState::Current
        }
    }

    /// Whether the flag is STALE.
    pub fn is_stale(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag.
    pub fn set(&self, state: DataPointState) {
        self.0.store(state == DataPointState::Stale, Ordering::Release);
    }

    /// Mark CURRENT and return whether the flag was STALE.
    ///
    /// Clearing before recomputing means a notification that lands during
    /// the recompute leaves the flag STALE for the next read.
    pub fn take_stale(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for StaleFlag {
    fn default() -> Self {
        Self::stale()
    }
}

// =============================================================================
// Source trait
// =============================================================================

/// Pluggable value producer behind a data point.
///
/// Implementations:
/// - `ConstantSource` - immutable value, always CURRENT
/// - `ComputedSource` - lazily recomputed from a closure while STALE
/// - `CompoundSource` - combines other data points' values
/// - feed adapters (field mirrors, market data, reference data)
pub trait DataPointSource: Send + Sync {
    /// Current value.
    ///
    /// Lazy sources recompute while STALE and mark themselves CURRENT.
    /// Push-fed sources return the last value they were given.
    fn value(&self) -> EngineResult<Value>;

    /// Staleness of the cached value.
    fn state(&self) -> DataPointState;

    /// Explicitly override the staleness.
    fn set_state(&self, state: DataPointState);

    /// Data points this source reads its value from.
    ///
    /// Binding registers each input as a dependency of the owning data
    /// point, which rejects cycles before any value is read.
    fn inputs(&self) -> Vec<Arc<DataPoint>> {
        Vec::new()
    }
}

// =============================================================================
// Constant
// =============================================================================

/// Source with an immutable value fixed at construction.
///
/// Always CURRENT: marking it STALE is ignored.
#[derive(Debug)]
pub struct ConstantSource {
    value: Value,
}

impl ConstantSource {
    /// Create a constant source.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl DataPointSource for ConstantSource {
    fn value(&self) -> EngineResult<Value> {
        Ok(self.value.clone())
    }

    fn state(&self) -> DataPointState {
        DataPointState::Current
    }

    fn set_state(&self, _state: DataPointState) {}
}

// =============================================================================
// Computed
// =============================================================================

type ComputeFn = dyn Fn() -> EngineResult<Value> + Send + Sync;

/// Lazily computed source.
///
/// The closure runs on the first read and on every read after the source
/// has been marked STALE. A failed computation leaves the source STALE.
pub struct ComputedSource {
    compute: Box<ComputeFn>,
    cache: Mutex<Option<Value>>,
    flag: StaleFlag,
}

impl ComputedSource {
    /// Create a computed source. Starts STALE.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> EngineResult<Value> + Send + Sync + 'static,
    {
        Self {
            compute: Box::new(compute),
            cache: Mutex::new(None),
            flag: StaleFlag::stale(),
        }
    }
}

impl DataPointSource for ComputedSource {
    fn value(&self) -> EngineResult<Value> {
        let mut cache = self.cache.lock();

        if self.flag.take_stale() || cache.is_none() {
            trace!("Recomputing stale source");
            let value = match (self.compute)() {
                Ok(value) => value,
                Err(e) => {
                    self.flag.set(DataPointState::Stale);
                    return Err(e);
                },
            };
            *cache = Some(value.clone());
            return Ok(value);
        }

        cache
            .clone()
            .ok_or_else(|| EngineError::SourceUnavailable("value not computed".to_string()))
    }

    fn state(&self) -> DataPointState {
        self.flag.state()
    }

    fn set_state(&self, state: DataPointState) {
        self.flag.set(state);
    }
}

impl fmt::Debug for ComputedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedSource")
            .field("state", &self.flag.state())
            .finish()
    }
}

// =============================================================================
// Compound
// =============================================================================

type CombineFn = dyn Fn(&[Value]) -> EngineResult<Value> + Send + Sync;

/// Source derived from other data points.
///
/// Inputs are read through `DataPoint::value`, so each input's own
/// recompute runs before the combine step. The combined value is cached
/// until the source is marked STALE again.
///
/// Binding it to a data point registers the inputs as dependencies, so
/// staleness of an input propagates here.
pub struct CompoundSource {
    inputs: Vec<Arc<DataPoint>>,
    combine: Box<CombineFn>,
    cache: Mutex<Option<Value>>,
    flag: StaleFlag,
}

impl CompoundSource {
    /// Create a compound source from inputs and a combining function.
    pub fn new<F>(inputs: Vec<Arc<DataPoint>>, combine: F) -> Self
    where
        F: Fn(&[Value]) -> EngineResult<Value> + Send + Sync + 'static,
    {
        Self {
            inputs,
            combine: Box::new(combine),
            cache: Mutex::new(None),
            flag: StaleFlag::stale(),
        }
    }

    /// Numeric sum of all inputs (e.g. margin + last price).
    pub fn sum(inputs: Vec<Arc<DataPoint>>) -> Self {
        Self::new(inputs, |values| {
            values
                .iter()
                .try_fold(Decimal::ZERO, |acc, v| -> EngineResult<Decimal> {
                    Ok(acc + v.as_decimal()?)
                })
                .map(Value::Number)
        })
    }

    /// Names of the input data points, in order.
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|dp| dp.name()).collect()
    }
}

impl DataPointSource for CompoundSource {
    fn value(&self) -> EngineResult<Value> {
        let mut cache = self.cache.lock();

        if self.flag.take_stale() || cache.is_none() {
            let inputs: EngineResult<Vec<Value>> =
                self.inputs.iter().map(|dp| dp.value()).collect();

            let value = match inputs.and_then(|values| (self.combine)(&values)) {
                Ok(value) => value,
                Err(e) => {
                    self.flag.set(DataPointState::Stale);
                    return Err(e);
                },
            };
            *cache = Some(value.clone());
            return Ok(value);
        }

        cache
            .clone()
            .ok_or_else(|| EngineError::SourceUnavailable("value not computed".to_string()))
    }

    fn state(&self) -> DataPointState {
        self.flag.state()
    }

    fn set_state(&self, state: DataPointState) {
        self.flag.set(state);
    }

    fn inputs(&self) -> Vec<Arc<DataPoint>> {
        self.inputs.clone()
    }
}

impl fmt::Debug for CompoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundSource")
            .field("inputs", &self.input_names())
            .field("state", &self.flag.state())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
