//! Bucketing function on timestamps (spec glossary: "Granularity").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    None,
    Second,
    Minute,
    Hour,
    Day,
    All,
}

impl Granularity {
    fn bucket_millis(self) -> Option<i64> {
        match self {
            Granularity::None => Some(1),
            Granularity::Second => Some(1_000),
            Granularity::Minute => Some(60_000),
            Granularity::Hour => Some(3_600_000),
            Granularity::Day => Some(86_400_000),
            Granularity::All => None,
        }
    }

    /// Truncate a millisecond timestamp to this granularity's bucket start
    /// (spec §4.3 insert path step 1). `ALL` collapses every timestamp to a
    /// single bucket (0), matching "one row per bucket, in bucket order"
    /// when the whole interval is one bucket.
    pub fn truncate(self, timestamp_millis: i64) -> i64 {
        match self.bucket_millis() {
            Some(bucket) => timestamp_millis.div_euclid(bucket) * bucket,
            None => 0,
        }
    }

    /// Enumerate bucket-start timestamps covering `[start, end)`.
    pub fn buckets(self, start: i64, end: i64) -> Vec<i64> {
        match self.bucket_millis() {
            None => vec![0],
            Some(bucket) => {
                let mut buckets = Vec::new();
                let mut t = self.truncate(start);
                while t < end {
                    buckets.push(t);
                    t += bucket;
                }
                buckets
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_granularity_collapses_to_one_bucket() {
        assert_eq!(Granularity::All.truncate(12345), 0);
        assert_eq!(Granularity::All.truncate(999999), 0);
    }

    #[test]
    fn hour_truncation() {
        let t = 3_600_000 * 5 + 123;
        assert_eq!(Granularity::Hour.truncate(t), 3_600_000 * 5);
    }

    #[test]
    fn buckets_cover_interval_in_order() {
        let buckets = Granularity::Hour.buckets(0, 3 * 3_600_000);
        assert_eq!(buckets, vec![0, 3_600_000, 2 * 3_600_000]);
    }
}
