//! Query engine (C5, spec §4.5, §6): a closed tagged `Query` variant, one
//! arm per query kind, each carrying exactly the wire fields that kind
//! needs (spec §9 — no query class hierarchy).

pub mod context;
pub mod dimension_spec;
pub mod engine;
pub mod executor;
pub mod merge;
pub mod pipeline;
pub mod post_aggregator;
pub mod rewrite;
pub mod runner;
pub mod sequence;
pub mod toolchest;
pub mod watcher;

use crate::filter::Filter;
use crate::incremental::AggregatorSpec;
use dimension_spec::DimensionSpec;
use post_aggregator::PostAggregator;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Interval {
    pub start_millis: i64,
    pub end_millis: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinType {
    Inner,
    Left,
    RightOuter,
    Full,
}

/// `ORDER BY`-equivalent for groupBy result rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderByColumn {
    pub dimension: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSpec {
    pub columns: Vec<OrderByColumn>,
    pub limit: Option<usize>,
}

/// Post-merge row filter on aggregated/post-aggregated values (spec §6
/// "having"). Expressed over the same comparator the filter planner
/// uses, rather than a second bespoke expression language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HavingSpec {
    GreaterThan { field: String, value: f64 },
    LessThan { field: String, value: f64 },
    Equal { field: String, value: f64 },
    And(Vec<HavingSpec>),
    Or(Vec<HavingSpec>),
}

impl HavingSpec {
    pub fn matches(&self, row: &ahash::AHashMap<String, crate::value::Value>) -> bool {
        match self {
            HavingSpec::GreaterThan { field, value } => row.get(field).map(|v| v.as_double() > *value).unwrap_or(false),
            HavingSpec::LessThan { field, value } => row.get(field).map(|v| v.as_double() < *value).unwrap_or(false),
            HavingSpec::Equal { field, value } => row.get(field).map(|v| v.as_double() == *value).unwrap_or(false),
            HavingSpec::And(children) => children.iter().all(|c| c.matches(row)),
            HavingSpec::Or(children) => children.iter().any(|c| c.matches(row)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "queryType", rename_all = "camelCase")]
pub enum Query {
    Timeseries {
        data_source: String,
        interval: Interval,
        filter: Option<Filter>,
        granularity: crate::segment::granularity::Granularity,
        aggregations: Vec<AggregatorSpec>,
        post_aggregations: Vec<PostAggregator>,
        descending: bool,
        limit: Option<usize>,
    },
    TopN {
        data_source: String,
        interval: Interval,
        filter: Option<Filter>,
        granularity: crate::segment::granularity::Granularity,
        dimension: DimensionSpec,
        metric: String,
        threshold: usize,
        aggregations: Vec<AggregatorSpec>,
        post_aggregations: Vec<PostAggregator>,
    },
    GroupBy {
        data_source: String,
        interval: Interval,
        filter: Option<Filter>,
        granularity: crate::segment::granularity::Granularity,
        dimensions: Vec<DimensionSpec>,
        aggregations: Vec<AggregatorSpec>,
        post_aggregations: Vec<PostAggregator>,
        having: Option<HavingSpec>,
        limit_spec: Option<LimitSpec>,
    },
    Select {
        data_source: String,
        interval: Interval,
        filter: Option<Filter>,
        columns: Vec<String>,
        descending: bool,
        limit: Option<usize>,
    },
    Stream {
        data_source: String,
        interval: Interval,
        filter: Option<Filter>,
        columns: Vec<String>,
    },
    Search {
        data_source: String,
        interval: Interval,
        filter: Option<Filter>,
        dimensions: Vec<String>,
        search_query: String,
        limit: usize,
    },
    Scan {
        data_source: String,
        interval: Interval,
        filter: Option<Filter>,
        columns: Vec<String>,
        batch_size: usize,
        limit: Option<usize>,
    },
    SegmentMetadata {
        data_source: String,
        interval: Interval,
    },
    UnionAll {
        queries: Vec<Query>,
    },
    Join {
        left: Box<Query>,
        right: Box<Query>,
        join_keys: Vec<(String, String)>,
        join_type: JoinType,
        /// `0` or `1` means unpartitioned: one left/right sub-query pair.
        /// `>1` partitions the driving (left) key range into this many
        /// ranges, each producing its own left/right sub-query pair
        /// (spec §4.5 "Join" step 1, §6 `numPartition`).
        #[serde(default)]
        num_partition: usize,
        /// Sketch-derived partition boundaries, `[lo, hi)` over the
        /// left-side driving key, one per partition (spec §6
        /// `scannerLen`: the sketch query's output, computed outside this
        /// crate and handed in already resolved).
        #[serde(default)]
        partition_bounds: Vec<(String, String)>,
    },
    Classify {
        base: Box<Query>,
        /// Sub-query whose output rows name a `threshold` and `tag` field
        /// each — the classifier's emitted model (spec §4.5 "Classify").
        classifier: Box<Query>,
        feature_field: String,
        tag_column: String,
    },
    KMeansTag {
        base: Box<Query>,
        k: usize,
        feature_fields: Vec<String>,
        max_iterations: usize,
    },
}

impl Query {
    pub fn data_source(&self) -> Option<&str> {
        match self {
            Query::Timeseries { data_source, .. }
            | Query::TopN { data_source, .. }
            | Query::GroupBy { data_source, .. }
            | Query::Select { data_source, .. }
            | Query::Stream { data_source, .. }
            | Query::Search { data_source, .. }
            | Query::Scan { data_source, .. }
            | Query::SegmentMetadata { data_source, .. } => Some(data_source),
            Query::UnionAll { .. } | Query::Join { .. } | Query::Classify { .. } | Query::KMeansTag { .. } => None,
        }
    }

    pub fn interval(&self) -> Option<Interval> {
        match self {
            Query::Timeseries { interval, .. }
            | Query::TopN { interval, .. }
            | Query::GroupBy { interval, .. }
            | Query::Select { interval, .. }
            | Query::Stream { interval, .. }
            | Query::Search { interval, .. }
            | Query::Scan { interval, .. }
            | Query::SegmentMetadata { interval, .. } => Some(*interval),
            _ => None,
        }
    }

    pub fn filter(&self) -> Option<&Filter> {
        match self {
            Query::Timeseries { filter, .. }
            | Query::TopN { filter, .. }
            | Query::GroupBy { filter, .. }
            | Query::Select { filter, .. }
            | Query::Stream { filter, .. }
            | Query::Search { filter, .. }
            | Query::Scan { filter, .. } => filter.as_ref(),
            _ => None,
        }
    }

    /// Post-aggregators a broadcast query kind carries; composite kinds
    /// and row-batch kinds with no post-aggregation stage return `&[]`.
    pub fn post_aggregations(&self) -> &[PostAggregator] {
        match self {
            Query::Timeseries { post_aggregations, .. }
            | Query::TopN { post_aggregations, .. }
            | Query::GroupBy { post_aggregations, .. } => post_aggregations,
            _ => &[],
        }
    }

    /// AND an extra conjunct onto whatever filter a broadcast query kind
    /// already carries. Used by `rewrite` to slice a query's driving key
    /// range into partitions (join partitioning, partitioned group-by);
    /// a no-op clone for kinds with no filter field.
    pub fn with_additional_filter(mut self, extra: Filter) -> Query {
        let slot = match &mut self {
            Query::Timeseries { filter, .. }
            | Query::TopN { filter, .. }
            | Query::GroupBy { filter, .. }
            | Query::Select { filter, .. }
            | Query::Stream { filter, .. }
            | Query::Search { filter, .. }
            | Query::Scan { filter, .. } => filter,
            _ => return self,
        };
        let combined = match slot.take() {
            Some(existing) => Filter::and(vec![existing, extra]),
            None => extra,
        };
        *slot = Some(combined);
        self
    }
}
