//! Value-range (histogram) index over a numeric column.
//!
//! Unlike the dictionary bitmap index, a histogram bucket can straddle a
//! predicate boundary, so membership of a bucket in a range only tells you
//! "some rows in this bucket might match" — the result is therefore
//! flagged inexact (spec §4.4: "selector/in on a column with a histogram →
//! ... not exact; caller must re-verify with the residual path").

use super::Predicate;
use crate::column::bitmap::{BitmapFactory, ImmutableBitmap};

struct Bucket {
    lower: f64,
    upper: f64,
    rows: ImmutableBitmap,
}

pub struct RangeIndex {
    buckets: Vec<Bucket>,
}

impl RangeIndex {
    /// Build a fixed-width histogram over `values`, bucketing row ids by
    /// value range.
    pub fn build(values: &[f64], bucket_count: usize) -> Self {
        if values.is_empty() || bucket_count == 0 {
            return Self { buckets: Vec::new() };
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let width = ((max - min) / bucket_count as f64).max(f64::EPSILON);

        let mut buckets: Vec<Bucket> = (0..bucket_count)
            .map(|i| Bucket {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                rows: ImmutableBitmap::empty(),
            })
            .collect();

        for (row, &v) in values.iter().enumerate() {
            let mut idx = (((v - min) / width) as usize).min(bucket_count - 1);
            if idx >= buckets.len() {
                idx = buckets.len() - 1;
            }
            buckets[idx].rows.0.insert(row as u32);
        }

        Self { buckets }
    }

    /// Returns `(bitmap, exact)`. Exact only when every overlapping bucket
    /// lies entirely within the predicate's bounds.
    pub fn filter_for(&self, predicate: &Predicate) -> (ImmutableBitmap, bool) {
        let mut exact = true;
        let mut matched = Vec::new();
        for bucket in &self.buckets {
            let fully_inside = predicate.matches_num(bucket.lower) && predicate.matches_num(bucket.upper);
            let partially_inside =
                predicate.matches_num(bucket.lower) || predicate.matches_num(bucket.upper) || fully_inside;
            if fully_inside {
                matched.push(&bucket.rows);
            } else if partially_inside {
                matched.push(&bucket.rows);
                exact = false;
            }
        }
        (BitmapFactory::union_all(matched.into_iter()), exact)
    }
}
