//! Aggregators (spec §3 "Aggregator"): a factory + running-state pair.
//! Every aggregator provides a combining operation that merges two
//! already-aggregated instances, used both by rollup merges within an
//! index and by cross-segment result merging (spec §4.5).

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Wire-shape of an aggregator spec (spec §6: "aggregations").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AggregatorSpec {
    LongSum { name: String, field_name: String },
    DoubleSum { name: String, field_name: String },
    FloatSum { name: String, field_name: String },
    LongMin { name: String, field_name: String },
    LongMax { name: String, field_name: String },
    DoubleMin { name: String, field_name: String },
    DoubleMax { name: String, field_name: String },
    FloatMin { name: String, field_name: String },
    FloatMax { name: String, field_name: String },
    Count { name: String },
}

impl AggregatorSpec {
    pub fn name(&self) -> &str {
        match self {
            AggregatorSpec::LongSum { name, .. }
            | AggregatorSpec::DoubleSum { name, .. }
            | AggregatorSpec::FloatSum { name, .. }
            | AggregatorSpec::LongMin { name, .. }
            | AggregatorSpec::LongMax { name, .. }
            | AggregatorSpec::DoubleMin { name, .. }
            | AggregatorSpec::DoubleMax { name, .. }
            | AggregatorSpec::FloatMin { name, .. }
            | AggregatorSpec::FloatMax { name, .. }
            | AggregatorSpec::Count { name } => name,
        }
    }

    pub fn field_name(&self) -> Option<&str> {
        match self {
            AggregatorSpec::LongSum { field_name, .. }
            | AggregatorSpec::DoubleSum { field_name, .. }
            | AggregatorSpec::FloatSum { field_name, .. }
            | AggregatorSpec::LongMin { field_name, .. }
            | AggregatorSpec::LongMax { field_name, .. }
            | AggregatorSpec::DoubleMin { field_name, .. }
            | AggregatorSpec::DoubleMax { field_name, .. }
            | AggregatorSpec::FloatMin { field_name, .. }
            | AggregatorSpec::FloatMax { field_name, .. } => Some(field_name),
            AggregatorSpec::Count { .. } => None,
        }
    }

    /// Max size (bytes) of the intermediate state — used by capacity
    /// accounting (spec §4.3). Every aggregator here has fixed-size state,
    /// so `providesEstimation` is always `false`.
    pub fn max_intermediate_size(&self) -> usize {
        8
    }

    pub fn provides_estimation(&self) -> bool {
        false
    }

    pub fn new_heap(&self) -> Box<dyn HeapAggregator> {
        use AggregatorSpec::*;
        match self {
            LongSum { .. } => Box::new(LongSumAggregator::default()),
            Count { .. } => Box::new(LongSumAggregator::default()),
            DoubleSum { .. } => Box::new(DoubleSumAggregator::default()),
            FloatSum { .. } => Box::new(FloatSumAggregator::default()),
            LongMin { .. } => Box::new(LongMinAggregator::default()),
            LongMax { .. } => Box::new(LongMaxAggregator::default()),
            DoubleMin { .. } => Box::new(DoubleMinAggregator::default()),
            DoubleMax { .. } => Box::new(DoubleMaxAggregator::default()),
            FloatMin { .. } => Box::new(FloatMinAggregator::default()),
            FloatMax { .. } => Box::new(FloatMaxAggregator::default()),
        }
    }
}

/// Heap-resident aggregator state: one allocation per active group. A
/// buffered variant (shared byte buffer, per-group offset) is not needed
/// here — `IncrementalIndex` keeps one boxed aggregator per fact-row
/// instead of a packed buffer, trading density for simplicity at the
/// scale this engine targets.
pub trait HeapAggregator: Send {
    fn aggregate(&mut self, value: &Value);
    fn get(&self) -> Value;
    fn reset(&mut self);
    /// Merge another already-aggregated instance into self.
    fn combine(&mut self, other: &dyn HeapAggregator);
    fn clone_box(&self) -> Box<dyn HeapAggregator>;
}

impl Clone for Box<dyn HeapAggregator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

macro_rules! sum_aggregator {
    ($name:ident, $repr:ty, $value_variant:ident, $extract:ident) => {
        #[derive(Default, Clone)]
        pub struct $name {
            state: $repr,
        }

        impl HeapAggregator for $name {
            fn aggregate(&mut self, value: &Value) {
                self.state += value.$extract();
            }
            fn get(&self) -> Value {
                Value::$value_variant(self.state)
            }
            fn reset(&mut self) {
                self.state = Default::default();
            }
            fn combine(&mut self, other: &dyn HeapAggregator) {
                self.state += other.get().$extract();
            }
            fn clone_box(&self) -> Box<dyn HeapAggregator> {
                Box::new(self.clone())
            }
        }
    };
}

sum_aggregator!(LongSumAggregator, i64, Long, as_long);
sum_aggregator!(DoubleSumAggregator, f64, Double, as_double);
// `FloatSum` stores and exposes `f32` — no implicit widening to `f64`
// (Open Question, resolved explicitly rather than left ambiguous).
sum_aggregator!(FloatSumAggregator, f32, Float, as_float);

macro_rules! minmax_aggregator {
    ($name:ident, $repr:ty, $init:expr, $cmp:ident, $value_variant:ident, $extract:ident) => {
        #[derive(Clone)]
        pub struct $name {
            state: $repr,
        }

        impl Default for $name {
            fn default() -> Self {
                Self { state: $init }
            }
        }

        impl HeapAggregator for $name {
            fn aggregate(&mut self, value: &Value) {
                let v: $repr = value.$extract();
                self.state = self.state.$cmp(v);
            }
            fn get(&self) -> Value {
                Value::$value_variant(self.state)
            }
            fn reset(&mut self) {
                self.state = $init;
            }
            fn combine(&mut self, other: &dyn HeapAggregator) {
                self.aggregate(&other.get());
            }
            fn clone_box(&self) -> Box<dyn HeapAggregator> {
                Box::new(self.clone())
            }
        }
    };
}

minmax_aggregator!(LongMinAggregator, i64, i64::MAX, min, Long, as_long);
minmax_aggregator!(LongMaxAggregator, i64, i64::MIN, max, Long, as_long);
minmax_aggregator!(DoubleMinAggregator, f64, f64::INFINITY, min, Double, as_double);
minmax_aggregator!(DoubleMaxAggregator, f64, f64::NEG_INFINITY, max, Double, as_double);
minmax_aggregator!(FloatMinAggregator, f32, f32::INFINITY, min, Float, as_float);
minmax_aggregator!(FloatMaxAggregator, f32, f32::NEG_INFINITY, max, Float, as_float);
