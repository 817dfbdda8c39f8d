//! Exogenous forcing terms.
//!
//! A source supplies a value for every variable of its block. Constant
//! sources ignore time; time-driven sources evaluate one [`TimeSignal`] per
//! variable.

use std::fmt;
use std::sync::Arc;

use hn_core::{Real, StateMap};
use indexmap::IndexMap;

use crate::block::Block;
use crate::error::{GraphError, GraphResult};

/// Closure of simulation time.
pub type SignalFn = Arc<dyn Fn(Real) -> Real + Send + Sync>;

/// Interpolation between time-series samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Zero-order hold: the most recent sample at or before `t`.
    Previous,
}

/// Sampled signal over a closed time span.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    times: Vec<Real>,
    values: Vec<Real>,
    interpolation: Interpolation,
}

impl TimeSeries {
    /// Relative slack on the span ends; integrators land on the final
    /// output time through floating-point sums.
    const SPAN_SLACK: Real = 1e-9;

    pub fn new(
        times: Vec<Real>,
        values: Vec<Real>,
        interpolation: Interpolation,
    ) -> GraphResult<Self> {
        if times.is_empty() {
            return Err(GraphError::InvalidSeries { what: "no samples" });
        }
        if times.len() != values.len() {
            return Err(GraphError::InvalidSeries {
                what: "times and values differ in length",
            });
        }
        if times.iter().chain(values.iter()).any(|v| !v.is_finite()) {
            return Err(GraphError::InvalidSeries {
                what: "non-finite sample",
            });
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GraphError::InvalidSeries {
                what: "times must be strictly increasing",
            });
        }
        Ok(Self {
            times,
            values,
            interpolation,
        })
    }

    pub fn start(&self) -> Real {
        self.times[0]
    }

    pub fn end(&self) -> Real {
        self.times[self.times.len() - 1]
    }

    pub fn times(&self) -> &[Real] {
        &self.times
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Value at `t`; a time outside the span is a [`GraphError::DataRange`].
    pub fn evaluate(&self, t: Real) -> GraphResult<Real> {
        let (start, end) = (self.start(), self.end());
        let slack = Self::SPAN_SLACK * (end - start).abs().max(1.0);
        if !t.is_finite() || t < start - slack || t > end + slack {
            return Err(GraphError::DataRange {
                time: t,
                start,
                end,
            });
        }
        let t = t.clamp(start, end);

        // First sample strictly after t
        let after = self.times.partition_point(|&x| x <= t);
        if after == 0 {
            return Ok(self.values[0]);
        }
        let i = after - 1;
        if after == self.times.len() || self.interpolation == Interpolation::Previous {
            return Ok(self.values[i]);
        }
        let (t0, t1) = (self.times[i], self.times[after]);
        let (v0, v1) = (self.values[i], self.values[after]);
        Ok(v0 + (v1 - v0) * (t - t0) / (t1 - t0))
    }
}

/// One time-dependent input.
#[derive(Clone)]
pub enum TimeSignal {
    Constant(Real),
    Series(TimeSeries),
    Function(SignalFn),
}

impl TimeSignal {
    pub fn function(f: impl Fn(Real) -> Real + Send + Sync + 'static) -> Self {
        TimeSignal::Function(Arc::new(f))
    }

    pub fn evaluate(&self, t: Real) -> GraphResult<Real> {
        match self {
            TimeSignal::Constant(v) => Ok(*v),
            TimeSignal::Series(series) => series.evaluate(t),
            TimeSignal::Function(f) => Ok(f(t)),
        }
    }
}

impl fmt::Debug for TimeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSignal::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            TimeSignal::Series(s) => f.debug_tuple("Series").field(s).finish(),
            TimeSignal::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A forcing term attached to a block.
#[derive(Debug, Clone)]
pub enum Source {
    Constant(StateMap),
    TimeDriven(IndexMap<String, TimeSignal>),
}

impl Source {
    /// Constant source from `(variable, value)` pairs.
    pub fn constant<K: Into<String>>(values: impl IntoIterator<Item = (K, Real)>) -> Self {
        Source::Constant(values.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Time-driven source from `(variable, signal)` pairs.
    pub fn time_driven<K: Into<String>>(
        signals: impl IntoIterator<Item = (K, TimeSignal)>,
    ) -> Self {
        Source::TimeDriven(signals.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// Names of the variables this source supplies.
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Source::Constant(map) => map.keys().map(String::as_str).collect(),
            Source::TimeDriven(map) => map.keys().map(String::as_str).collect(),
        }
    }

    pub fn is_time_driven(&self) -> bool {
        matches!(self, Source::TimeDriven(_))
    }

    /// Value for `variable` at time `t`, if the source supplies it.
    pub fn value(&self, variable: &str, t: Real) -> Option<GraphResult<Real>> {
        match self {
            Source::Constant(map) => map.get(variable).map(|v| Ok(*v)),
            Source::TimeDriven(map) => map.get(variable).map(|s| s.evaluate(t)),
        }
    }

    /// Per-variable values in `block`'s declaration order.
    pub fn evaluate(&self, block: &Block, t: Real) -> GraphResult<StateMap> {
        let mut out = StateMap::with_capacity(block.state().len());
        for name in block.state().keys() {
            let v = self
                .value(name, t)
                .ok_or_else(|| GraphError::MissingSourceVariable {
                    block: block.name().to_string(),
                    variable: name.clone(),
                })??;
            out.insert(name.clone(), v);
        }
        Ok(out)
    }

    /// Add this source's values into `acc`, laid out in `block` order.
    pub(crate) fn accumulate(&self, block: &Block, t: Real, acc: &mut [Real]) -> GraphResult<()> {
        for (slot, name) in acc.iter_mut().zip(block.state().keys()) {
            let v = self
                .value(name, t)
                .ok_or_else(|| GraphError::MissingSourceVariable {
                    block: block.name().to_string(),
                    variable: name.clone(),
                })??;
            *slot += v;
        }
        Ok(())
    }
}
