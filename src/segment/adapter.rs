//! `StorageAdapter`: wraps a segment's column readers behind
//! `makeCursors` (spec §4.2).

use super::cursor::Cursor;
use super::granularity::Granularity;
use super::Segment;
use crate::column::bitmap::ImmutableBitmap;
use crate::column::capabilities::ColumnCapabilities;
use crate::filter::planner::{partition_with_bitmap_support, ColumnResolver};
use crate::filter::Filter;
use std::sync::Arc;

pub struct StorageAdapter {
    segment: Arc<Segment>,
}

impl StorageAdapter {
    pub fn new(segment: Arc<Segment>) -> Self {
        Self { segment }
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.segment.dimension_names()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.segment.metric_names()
    }

    pub fn capabilities(&self, column: &str) -> Option<ColumnCapabilities> {
        self.segment.capabilities(column)
    }

    pub fn get_min_time(&self) -> i64 {
        self.segment.get_min_time()
    }

    pub fn get_max_time(&self) -> i64 {
        self.segment.get_max_time()
    }

    pub fn row_count(&self) -> usize {
        self.segment.row_count()
    }

    pub fn get_dimension_cardinality(&self, dimension: &str) -> usize {
        match self.segment.column(dimension) {
            Some(crate::column::ColumnReader::Dictionary(col)) => col.cardinality(),
            _ => 0,
        }
    }

    /// `makeCursors(filter, interval, virtualColumns, granularity, descending)
    /// -> lazy sequence of Cursor` (spec §4.2 steps 1-5).
    ///
    /// `virtualColumns` (expression-derived columns computed at query time)
    /// are out of scope for this engine: the spec's data model (§3) defines
    /// only physical column kinds, and no operation in this spec reads a
    /// virtual column that isn't already expressible as an `Expression`
    /// filter leaf or a post-aggregator.
    pub fn make_cursors(
        &self,
        filter: Option<&Filter>,
        interval_start: i64,
        interval_end: i64,
        granularity: Granularity,
        descending: bool,
    ) -> Vec<Cursor> {
        // Step 1: clip to segment bounds.
        let start = interval_start.max(self.segment.get_min_time());
        let end = interval_end.min(self.segment.get_max_time());
        if start >= end {
            return Vec::new();
        }

        // Steps 2-3: partition the filter and evaluate the bitmap part.
        let num_rows = self.segment.row_count() as u32;
        let resolver = ColumnResolver::new(self.columns_map(), num_rows);
        let (bitmap_part, residual_part) = match filter {
            None => (None, None),
            Some(f) => partition_with_bitmap_support(f, &resolver),
        };
        let (row_bitmap, bitmap_exact) = match &bitmap_part {
            Some(f) => resolver.to_bitmap(f),
            None => (ImmutableBitmap::all(num_rows), true),
        };
        // spec §4.4: an inexact bitmap result (e.g. a histogram bucket that
        // straddles a predicate boundary) must still be re-verified row-wise,
        // so fold the bitmap-part filter itself back into the residual.
        let residual_part = if bitmap_exact {
            residual_part
        } else {
            let bitmap_filter = bitmap_part.clone().expect("inexact bitmap implies a bitmap_part");
            Some(match residual_part {
                Some(r) => Filter::and(vec![r, bitmap_filter]),
                None => bitmap_filter,
            })
        };

        // Step 4/5: one cursor per granularity bucket, time-window checked.
        let time_col = self.segment.time_column();
        granularity
            .buckets(start, end)
            .into_iter()
            .map(|bucket_start| {
                let bucket_end = match granularity {
                    Granularity::All => end,
                    _ => (bucket_start + granularity_width(granularity)).min(end),
                };
                let covers_full_span =
                    bucket_start <= self.segment.get_min_time() && bucket_end >= self.segment.get_max_time();

                let rows: Vec<u32> = row_bitmap
                    .iter()
                    .filter(|&row| {
                        if covers_full_span {
                            return true;
                        }
                        let t = time_col.get_long_single_value_row(row as usize);
                        t >= bucket_start && t < bucket_end
                    })
                    .collect();

                Cursor::new(self.segment.clone(), rows, descending, residual_part.clone(), bucket_start, bucket_end)
            })
            .collect()
    }

    fn columns_map(&self) -> &ahash::AHashMap<String, crate::column::ColumnReader> {
        // SAFETY-free accessor: Segment stores its columns privately; expose
        // a narrow borrow for the resolver rather than cloning the map.
        self.segment.columns_ref()
    }
}

fn granularity_width(g: Granularity) -> i64 {
    match g {
        Granularity::None => 1,
        Granularity::Second => 1_000,
        Granularity::Minute => 60_000,
        Granularity::Hour => 3_600_000,
        Granularity::Day => 86_400_000,
        Granularity::All => i64::MAX,
    }
}
