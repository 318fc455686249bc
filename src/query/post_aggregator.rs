//! Post-aggregators (spec §6): scalar expressions evaluated over a row of
//! already-finalized aggregator values, after the per-segment aggregation
//! pass and before (or during) result finalization.

use crate::value::Value;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostAggregator {
    FieldAccess { name: String, field_name: String },
    Constant { name: String, value: f64 },
    Arithmetic { name: String, op: ArithmeticOp, fields: Vec<PostAggregator> },
    /// Wraps a dependency's name so the finalizer applies the
    /// aggregator's finalize step before reading it, instead of the raw
    /// intermediate state (e.g. a cardinality sketch's estimate).
    Finalizing { name: String, field_name: String },
}

impl PostAggregator {
    pub fn name(&self) -> &str {
        match self {
            PostAggregator::FieldAccess { name, .. }
            | PostAggregator::Constant { name, .. }
            | PostAggregator::Arithmetic { name, .. }
            | PostAggregator::Finalizing { name, .. } => name,
        }
    }

    /// Evaluate against a row of already-finalized values, keyed by
    /// aggregator/dimension output name.
    pub fn evaluate(&self, row: &AHashMap<String, Value>) -> f64 {
        match self {
            PostAggregator::FieldAccess { field_name, .. } | PostAggregator::Finalizing { field_name, .. } => {
                row.get(field_name).map(|v| v.as_double()).unwrap_or(0.0)
            }
            PostAggregator::Constant { value, .. } => *value,
            PostAggregator::Arithmetic { op, fields, .. } => {
                let mut values = fields.iter().map(|f| f.evaluate(row));
                let Some(first) = values.next() else { return 0.0 };
                values.fold(first, |acc, v| match op {
                    ArithmeticOp::Add => acc + v,
                    ArithmeticOp::Subtract => acc - v,
                    ArithmeticOp::Multiply => acc * v,
                    ArithmeticOp::Divide => {
                        if v == 0.0 {
                            0.0
                        } else {
                            acc / v
                        }
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_divides_by_zero_to_zero_rather_than_nan() {
        let pa = PostAggregator::Arithmetic {
            name: "ratio".into(),
            op: ArithmeticOp::Divide,
            fields: vec![
                PostAggregator::Constant { name: "a".into(), value: 4.0 },
                PostAggregator::Constant { name: "b".into(), value: 0.0 },
            ],
        };
        assert_eq!(pa.evaluate(&AHashMap::new()), 0.0);
    }

    #[test]
    fn field_access_reads_finalized_row_value() {
        let mut row = AHashMap::new();
        row.insert("sum".to_string(), Value::Long(42));
        let pa = PostAggregator::FieldAccess { name: "x".into(), field_name: "sum".into() };
        assert_eq!(pa.evaluate(&row), 42.0);
    }
}
