//! Query toolchests (spec §4.5, §9): the per-query-kind strategy bundle
//! — cache key, merge, decoration, and finalization — selected once by
//! query kind and then driven generically by the executor. This is the
//! "favor a trait implemented per variant over a god-object with a
//! switch in every method" shape the design notes ask for.

use super::merge::{self, ResultRow};
use super::post_aggregator::PostAggregator;
use super::{HavingSpec, LimitSpec, Query};
use crate::incremental::AggregatorSpec;
use crate::value::Value;

/// Strategy bundle for one query kind. `merge_results` assumes its inputs
/// already come from `pre_merge_decoration`; `finalize_results` runs
/// last, after `post_merge_decoration`.
pub trait QueryToolchest: Send + Sync {
    /// A stable string identifying this query's cacheable shape —
    /// callers hash this rather than the whole query to build a cache
    /// key, so two structurally-identical queries with different
    /// whitespace or field order still share a cache entry.
    fn cache_key(&self) -> String;

    fn merge_results(&self, partials: Vec<ResultRow>) -> Vec<ResultRow>;

    /// Runs once per segment-level partial before it enters merge — a
    /// no-op for every kind here, but the seam rewrite.rs's
    /// partitioned-groupBy rewrite hooks into.
    fn pre_merge_decoration(&self, rows: Vec<ResultRow>) -> Vec<ResultRow> {
        rows
    }

    fn post_merge_decoration(&self, rows: Vec<ResultRow>) -> Vec<ResultRow> {
        rows
    }

    /// Evaluate post-aggregators and materialize their outputs as
    /// additional fields. Idempotent: calling it twice on an
    /// already-finalized row set is a no-op because the post-aggregator
    /// fields it would add already exist with the same values.
    fn finalize_results(&self, rows: Vec<ResultRow>, post_aggregations: &[PostAggregator]) -> Vec<ResultRow> {
        rows.into_iter()
            .map(|mut row| {
                for pa in post_aggregations {
                    let value = pa.evaluate(&row);
                    row.insert(pa.name().to_string(), Value::Double(value));
                }
                row
            })
            .collect()
    }
}

pub struct TimeseriesToolchest {
    pub aggregations: Vec<AggregatorSpec>,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl QueryToolchest for TimeseriesToolchest {
    fn cache_key(&self) -> String {
        format!("timeseries:{}", self.aggregations.iter().map(|a| a.name()).collect::<Vec<_>>().join(","))
    }

    fn merge_results(&self, partials: Vec<ResultRow>) -> Vec<ResultRow> {
        merge::merge_timeseries(partials, &self.aggregations, self.descending, self.limit)
    }
}

pub struct TopNToolchest {
    pub dimension_output: String,
    pub metric: String,
    pub threshold: usize,
    pub aggregations: Vec<AggregatorSpec>,
}

impl QueryToolchest for TopNToolchest {
    fn cache_key(&self) -> String {
        format!("topn:{}:{}", self.dimension_output, self.metric)
    }

    fn merge_results(&self, partials: Vec<ResultRow>) -> Vec<ResultRow> {
        merge::merge_top_n(partials, &self.dimension_output, &self.metric, self.threshold, &self.aggregations)
    }
}

pub struct GroupByToolchest {
    pub dimension_outputs: Vec<String>,
    pub aggregations: Vec<AggregatorSpec>,
    pub having: Option<HavingSpec>,
    pub limit_spec: Option<LimitSpec>,
}

impl QueryToolchest for GroupByToolchest {
    fn cache_key(&self) -> String {
        format!("groupby:{}", self.dimension_outputs.join(","))
    }

    fn merge_results(&self, partials: Vec<ResultRow>) -> Vec<ResultRow> {
        merge::merge_group_by(partials, &self.dimension_outputs, &self.aggregations, self.having.as_ref(), self.limit_spec.as_ref())
    }
}

pub struct RowBatchToolchest {
    pub descending: bool,
    pub limit: Option<usize>,
}

impl QueryToolchest for RowBatchToolchest {
    fn cache_key(&self) -> String {
        "rowbatch".to_string()
    }

    fn merge_results(&self, partials: Vec<ResultRow>) -> Vec<ResultRow> {
        merge::merge_row_batches(partials, self.descending, self.limit)
    }
}

pub struct UnionAllToolchest;

impl QueryToolchest for UnionAllToolchest {
    fn cache_key(&self) -> String {
        "unionall".to_string()
    }

    fn merge_results(&self, partials: Vec<ResultRow>) -> Vec<ResultRow> {
        partials
    }
}

/// Select the toolchest matching a query's kind. Join/Classify/KMeansTag
/// are rewritten (see `rewrite.rs`) into a base query plus a
/// post-processing step before this is consulted, so they never appear
/// here directly.
pub fn toolchest_for(query: &Query) -> Box<dyn QueryToolchest> {
    match query {
        Query::Timeseries { aggregations, descending, limit, .. } => {
            Box::new(TimeseriesToolchest { aggregations: aggregations.clone(), descending: *descending, limit: *limit })
        }
        Query::TopN { dimension, metric, threshold, aggregations, .. } => Box::new(TopNToolchest {
            dimension_output: dimension.output_name.clone(),
            metric: metric.clone(),
            threshold: *threshold,
            aggregations: aggregations.clone(),
        }),
        Query::GroupBy { dimensions, aggregations, having, limit_spec, .. } => Box::new(GroupByToolchest {
            dimension_outputs: dimensions.iter().map(|d| d.output_name.clone()).collect(),
            aggregations: aggregations.clone(),
            having: having.clone(),
            limit_spec: limit_spec.clone(),
        }),
        Query::Select { descending, limit, .. } => Box::new(RowBatchToolchest { descending: *descending, limit: *limit }),
        Query::Scan { limit, .. } => Box::new(RowBatchToolchest { descending: false, limit: *limit }),
        Query::Stream { .. } | Query::Search { .. } | Query::SegmentMetadata { .. } => {
            Box::new(RowBatchToolchest { descending: false, limit: None })
        }
        Query::UnionAll { .. } => Box::new(UnionAllToolchest),
        Query::Join { .. } | Query::Classify { .. } | Query::KMeansTag { .. } => Box::new(UnionAllToolchest),
    }
}
