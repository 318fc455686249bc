//! Primitive value kinds shared across the column store, incremental index,
//! and query engine (spec §3 "Primitive value kinds").

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The type tag of a column or a query-time scalar.
///
/// `Dimension` is distinguished from `String` even though both are
/// dictionary-encoded string data: a `Dimension` is specifically a column
/// used as a grouping key, where a bare `String` column may also carry a
/// metric-histogram or text index rather than a bitmap index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Long,
    Float,
    Double,
    String,
    Dimension,
    Complex,
    Array,
    Map,
}

/// A materialized scalar value. Numeric values have a well-defined null
/// convention (spec §3): an absent numeric cell reads back as zero, and a
/// null string reads back as an empty string unless a converter layer
/// reverses that for emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Complex(Vec<u8>),
    Array(Vec<Value>),
    Null,
}

impl Value {
    pub fn as_long(&self) -> i64 {
        match self {
            Value::Long(v) => *v,
            Value::Float(v) => *v as i64,
            Value::Double(v) => *v as i64,
            Value::String(s) => s.parse().unwrap_or(0),
            Value::Null => 0,
            _ => 0,
        }
    }

    pub fn as_double(&self) -> f64 {
        match self {
            Value::Long(v) => *v as f64,
            Value::Float(v) => *v as f64,
            Value::Double(v) => *v,
            Value::String(s) => s.parse().unwrap_or(0.0),
            Value::Null => 0.0,
            _ => 0.0,
        }
    }

    pub fn as_float(&self) -> f32 {
        match self {
            Value::Float(v) => *v,
            other => other.as_double() as f32,
        }
    }

    /// Null strings coalesce to the empty string on read (spec §3).
    pub fn as_str_coalesced(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::Long(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            _ => String::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Total order over values used by the rollup key comparator (spec §3,
/// `TimeAndDims`). Numbers order numerically, strings lexicographically;
/// cross-kind comparisons fall back to a stable tag ordering so the
/// comparator never panics on heterogeneous input.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Long(a), Long(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (String(a), String(b)) => a.partial_cmp(b),
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => Some(Ordering::Less),
            (_, Null) => Some(Ordering::Greater),
            _ => self.as_double().partial_cmp(&other.as_double()),
        }
    }
}
