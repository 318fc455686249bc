//! Generic numeric column (spec §3, §4.1).
//!
//! A compressed run of fixed-width cells plus an optional value-range
//! (histogram) bitmap index. Compression itself is out of scope for this
//! engine's non-goals (bit-exact on-disk format is explicitly excluded);
//! what matters here is the reader contract `getLongSingleValueRow` /
//! `getFloatSingleValueRow` / `getDoubleSingleValueRow`, so storage is a
//! plain `Vec` rather than a bit-packed run.

use super::capabilities::ColumnCapabilities;
use crate::value::ValueType;

#[derive(Debug, Clone)]
pub enum NumericColumn {
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl NumericColumn {
    pub fn length(&self) -> usize {
        match self {
            NumericColumn::Long(v) => v.len(),
            NumericColumn::Float(v) => v.len(),
            NumericColumn::Double(v) => v.len(),
        }
    }

    pub fn capabilities(&self) -> ColumnCapabilities {
        let ty = match self {
            NumericColumn::Long(_) => ValueType::Long,
            NumericColumn::Float(_) => ValueType::Float,
            NumericColumn::Double(_) => ValueType::Double,
        };
        ColumnCapabilities::new(ty).with_metric_histogram()
    }

    /// Absent numeric cells read back as zero (spec §3 null convention);
    /// there is no out-of-range case since `offset` is always cursor-checked.
    pub fn get_long_single_value_row(&self, offset: usize) -> i64 {
        match self {
            NumericColumn::Long(v) => v.get(offset).copied().unwrap_or(0),
            NumericColumn::Float(v) => v.get(offset).copied().unwrap_or(0.0) as i64,
            NumericColumn::Double(v) => v.get(offset).copied().unwrap_or(0.0) as i64,
        }
    }

    pub fn get_float_single_value_row(&self, offset: usize) -> f32 {
        match self {
            NumericColumn::Long(v) => v.get(offset).copied().unwrap_or(0) as f32,
            NumericColumn::Float(v) => v.get(offset).copied().unwrap_or(0.0),
            NumericColumn::Double(v) => v.get(offset).copied().unwrap_or(0.0) as f32,
        }
    }

    pub fn get_double_single_value_row(&self, offset: usize) -> f64 {
        match self {
            NumericColumn::Long(v) => v.get(offset).copied().unwrap_or(0) as f64,
            NumericColumn::Float(v) => v.get(offset).copied().unwrap_or(0.0) as f64,
            NumericColumn::Double(v) => v.get(offset).copied().unwrap_or(0.0),
        }
    }

    pub fn as_f64(&self, offset: usize) -> f64 {
        self.get_double_single_value_row(offset)
    }
}
