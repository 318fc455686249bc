//! `TimeAndDims`: the rollup key (spec §3, §4.3 "Incremental index").
//!
//! Rollup mode treats two rows with identical `(bucketedTimestamp,
//! dimIdsPerDim)` as one fact: their metrics are merged via each
//! aggregator's combining factory. Non-rollup mode never merges — every
//! inserted row gets its own fact slot, which the key achieves by tagging
//! each key with a strictly increasing insertion sequence that the
//! comparator treats as a tiebreaker and `Eq`/`Hash` treat as part of the
//! identity.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Dictionary-encoded dimension values for one fact row: `dim_ids[i]` is
/// the (possibly multi-value, already sorted) set of ids for dimension
/// `i`, ordered to match the index's dimension list.
#[derive(Debug, Clone)]
pub struct TimeAndDims {
    pub bucketed_timestamp: i64,
    pub dim_ids_per_dim: Vec<Vec<i32>>,
    /// `Some(n)` in non-rollup mode, where `n` is a strictly increasing
    /// insertion sequence that makes every row distinct regardless of
    /// dimension values. `None` in rollup mode, where rows with identical
    /// time+dims are the same key.
    tiebreaker: Option<u64>,
}

impl TimeAndDims {
    pub fn rollup(bucketed_timestamp: i64, dim_ids_per_dim: Vec<Vec<i32>>) -> Self {
        Self { bucketed_timestamp, dim_ids_per_dim, tiebreaker: None }
    }

    pub fn non_rollup(bucketed_timestamp: i64, dim_ids_per_dim: Vec<Vec<i32>>, sequence: u64) -> Self {
        Self { bucketed_timestamp, dim_ids_per_dim, tiebreaker: Some(sequence) }
    }
}

impl PartialEq for TimeAndDims {
    fn eq(&self, other: &Self) -> bool {
        self.bucketed_timestamp == other.bucketed_timestamp
            && self.dim_ids_per_dim == other.dim_ids_per_dim
            && self.tiebreaker == other.tiebreaker
    }
}
impl Eq for TimeAndDims {}

impl Hash for TimeAndDims {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bucketed_timestamp.hash(state);
        self.dim_ids_per_dim.hash(state);
        self.tiebreaker.hash(state);
    }
}

/// Orders facts for iteration: time first, then dimension ids
/// lexicographically, then the non-rollup tiebreaker (spec §4.3:
/// "iteration yields facts ordered by time then dimension ids").
impl PartialOrd for TimeAndDims {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeAndDims {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bucketed_timestamp
            .cmp(&other.bucketed_timestamp)
            .then_with(|| self.dim_ids_per_dim.cmp(&other.dim_ids_per_dim))
            .then_with(|| self.tiebreaker.cmp(&other.tiebreaker))
    }
}
