//! Cursor: a transient per-granularity-bucket iterator over one segment
//! (spec §3 glossary, §4.2). Offsets may be ascending or descending; a
//! descending cursor traverses a physically ascending column by reversed
//! row ids, so column storage never needs a second, reversed copy.

use super::Segment;
use crate::column::ColumnReader;
use crate::filter::Filter;
use crate::value::Value;
use std::sync::Arc;

/// One granularity-bucket's worth of qualifying row offsets, pre-filtered
/// by the bitmap part and the time window, advanced past rows that fail
/// the residual predicate (spec §4.2 step 5).
pub struct Cursor {
    segment: Arc<Segment>,
    rows: Vec<u32>,
    position: usize,
    residual: Option<Filter>,
    pub bucket_start: i64,
    pub bucket_end: i64,
}

impl Cursor {
    pub fn new(
        segment: Arc<Segment>,
        mut rows: Vec<u32>,
        descending: bool,
        residual: Option<Filter>,
        bucket_start: i64,
        bucket_end: i64,
    ) -> Self {
        rows.sort_unstable();
        if descending {
            rows.reverse();
        }
        let mut cursor = Self { segment, rows, position: 0, residual, bucket_start, bucket_end };
        cursor.skip_non_matching();
        cursor
    }

    fn column_value(&self, column: &str) -> Option<String> {
        let offset = *self.rows.get(self.position)? as usize;
        match self.segment.column(column)? {
            ColumnReader::Dictionary(col) => {
                let id = col.get_single_value_row(offset);
                col.lookup_name(id).map(|s| s.to_string())
            }
            ColumnReader::Numeric(col) => Some(col.get_double_single_value_row(offset).to_string()),
            ColumnReader::Complex(_) => None,
        }
    }

    fn row_matches_residual(&self) -> bool {
        match &self.residual {
            None => true,
            Some(filter) => filter.matches_row(&|name| self.column_value(name)),
        }
    }

    fn skip_non_matching(&mut self) {
        while self.position < self.rows.len() && !self.row_matches_residual() {
            self.position += 1;
        }
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.rows.len()
    }

    pub fn advance(&mut self) {
        if !self.is_done() {
            self.position += 1;
            self.skip_non_matching();
        }
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.skip_non_matching();
    }

    /// The underlying segment row offset the cursor currently points at.
    pub fn current_offset(&self) -> Option<u32> {
        self.rows.get(self.position).copied()
    }

    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }

    /// A single-column accessor closure, used by dimension/metric
    /// selectors to read the cursor's current row.
    pub fn column_reader_for(&self, column: &str) -> impl Fn() -> Option<String> + '_ {
        move || self.column_value(column)
    }

    /// Typed read of the current row's `__time` column.
    pub fn time_value(&self) -> i64 {
        let Some(offset) = self.current_offset() else { return self.bucket_start };
        self.segment.time_column().get_long_single_value_row(offset as usize)
    }

    /// Typed read of one column at the current row — used by aggregator
    /// and dimension-spec evaluation, where the string-coalescing
    /// `column_value` used for residual filtering would lose numeric
    /// precision.
    pub fn value(&self, column: &str) -> Value {
        let Some(offset) = self.current_offset() else { return Value::Null };
        match self.segment.column(column) {
            None => Value::Null,
            Some(ColumnReader::Dictionary(col)) => {
                let id = col.get_single_value_row(offset as usize);
                col.lookup_name(id).map(|s| Value::String(s.to_string())).unwrap_or(Value::Null)
            }
            Some(ColumnReader::Numeric(col)) => Value::Double(col.get_double_single_value_row(offset as usize)),
            Some(ColumnReader::Complex(_)) => Value::Null,
        }
    }
}
