//! Per-segment runner (spec §4.5): executes one query against one
//! segment reference, producing a partial result the merge stage later
//! combines. The runner acquires its `SegmentHandle` for the whole scan
//! and relies on `Drop` to release it on every exit path, including
//! cooperative cancellation.

use super::merge::ResultRow;
use super::{Interval, Query};
use crate::error::{EngineError, EngineResult};
use crate::incremental::aggregator::HeapAggregator;
use crate::incremental::AggregatorSpec;
use crate::query::dimension_spec::DimensionSpec;
use crate::query::watcher::CancellationToken;
use crate::segment::adapter::StorageAdapter;
use crate::segment::granularity::Granularity;
use crate::segment::reference::SegmentHandle;
use crate::value::Value;
use ahash::AHashMap;

/// Run `query` against the segment behind `handle`. Checks cancellation
/// between cursors (spec §5: "runners poll a flag between row batches")
/// rather than per row, which would dominate the cost of cheap queries.
pub fn run_on_segment(query: &Query, handle: &SegmentHandle, cancellation: &CancellationToken) -> EngineResult<Vec<ResultRow>> {
    let adapter = StorageAdapter::new(handle.segment().clone());

    match query {
        Query::Timeseries { interval, filter, granularity, aggregations, descending, .. } => {
            run_aggregating(&adapter, *interval, filter.as_ref(), *granularity, &[], aggregations, *descending, cancellation)
        }
        Query::TopN { interval, filter, granularity, dimension, aggregations, .. } => run_aggregating(
            &adapter,
            *interval,
            filter.as_ref(),
            *granularity,
            std::slice::from_ref(dimension),
            aggregations,
            false,
            cancellation,
        ),
        Query::GroupBy { interval, filter, granularity, dimensions, aggregations, .. } => {
            run_aggregating(&adapter, *interval, filter.as_ref(), *granularity, dimensions, aggregations, false, cancellation)
        }
        Query::Select { interval, filter, columns, descending, .. } => {
            run_row_batch(&adapter, *interval, filter.as_ref(), columns, *descending, cancellation)
        }
        Query::Scan { interval, filter, columns, .. } => {
            run_row_batch(&adapter, *interval, filter.as_ref(), columns, false, cancellation)
        }
        Query::Stream { interval, filter, columns, .. } => {
            run_row_batch(&adapter, *interval, filter.as_ref(), columns, false, cancellation)
        }
        Query::Search { interval, filter, dimensions, search_query, limit, .. } => {
            run_search(&adapter, *interval, filter.as_ref(), dimensions, search_query, *limit, cancellation)
        }
        Query::SegmentMetadata { interval, .. } => run_segment_metadata(&adapter, *interval),
        Query::UnionAll { .. } | Query::Join { .. } | Query::Classify { .. } | Query::KMeansTag { .. } => {
            Err(EngineError::InvalidQuery("composite query kinds are not runnable directly against a segment".into()))
        }
    }
}

fn run_aggregating(
    adapter: &StorageAdapter,
    interval: Interval,
    filter: Option<&crate::filter::Filter>,
    granularity: Granularity,
    dimensions: &[DimensionSpec],
    aggregations: &[AggregatorSpec],
    descending: bool,
    cancellation: &CancellationToken,
) -> EngineResult<Vec<ResultRow>> {
    let cursors = adapter.make_cursors(filter, interval.start_millis, interval.end_millis, granularity, descending);

    // Keyed on (bucket_start, dimension-value key) so rows with identical
    // dimensions but different time buckets stay in separate groups.
    let mut groups: AHashMap<(i64, Vec<String>), (Vec<Value>, Vec<Box<dyn HeapAggregator>>)> = AHashMap::new();
    let mut order: Vec<(i64, Vec<String>)> = Vec::new();

    for mut cursor in cursors {
        if cancellation.is_cancelled() {
            return Err(EngineError::Interrupted { reason: "cancelled".into() });
        }
        while !cursor.is_done() {
            let dim_values: Vec<Value> = dimensions
                .iter()
                .map(|d| {
                    let raw = cursor.value(&d.dimension).as_str_coalesced();
                    d.apply(&raw).map(Value::String).unwrap_or(Value::Null)
                })
                .collect();
            let dim_key: Vec<String> = dim_values.iter().map(Value::as_str_coalesced).collect();
            let key = (cursor.bucket_start, dim_key);

            let entry = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                (dim_values.clone(), aggregations.iter().map(|a| a.new_heap()).collect())
            });
            for (agg, spec) in entry.1.iter_mut().zip(aggregations) {
                match spec {
                    AggregatorSpec::Count { .. } => agg.aggregate(&Value::Long(1)),
                    _ => {
                        if let Some(field) = spec.field_name() {
                            agg.aggregate(&cursor.value(field));
                        }
                    }
                }
            }
            cursor.advance();
        }
    }

    Ok(order
        .into_iter()
        .map(|key| {
            let bucket_start = key.0;
            let (dim_values, aggs) = groups.remove(&key).expect("group present for its own key");
            let mut row: ResultRow = AHashMap::new();
            row.insert("__time".to_string(), Value::Long(bucket_start));
            for (dim, value) in dimensions.iter().zip(dim_values) {
                row.insert(dim.output_name.clone(), value);
            }
            for (spec, agg) in aggregations.iter().zip(aggs.iter()) {
                row.insert(spec.name().to_string(), agg.get());
            }
            row
        })
        .collect())
}

fn run_row_batch(
    adapter: &StorageAdapter,
    interval: Interval,
    filter: Option<&crate::filter::Filter>,
    columns: &[String],
    descending: bool,
    cancellation: &CancellationToken,
) -> EngineResult<Vec<ResultRow>> {
    let cursors = adapter.make_cursors(filter, interval.start_millis, interval.end_millis, Granularity::All, descending);
    let mut rows = Vec::new();
    for mut cursor in cursors {
        if cancellation.is_cancelled() {
            return Err(EngineError::Interrupted { reason: "cancelled".into() });
        }
        while !cursor.is_done() {
            let mut row: ResultRow = AHashMap::new();
            row.insert("__time".to_string(), Value::Long(cursor.time_value()));
            for column in columns {
                row.insert(column.clone(), cursor.value(column));
            }
            rows.push(row);
            cursor.advance();
        }
    }
    Ok(rows)
}

fn run_search(
    adapter: &StorageAdapter,
    interval: Interval,
    filter: Option<&crate::filter::Filter>,
    dimensions: &[String],
    search_query: &str,
    limit: usize,
    cancellation: &CancellationToken,
) -> EngineResult<Vec<ResultRow>> {
    let cursors = adapter.make_cursors(filter, interval.start_millis, interval.end_millis, Granularity::All, false);
    let mut hits: Vec<ResultRow> = Vec::new();
    'outer: for mut cursor in cursors {
        if cancellation.is_cancelled() {
            return Err(EngineError::Interrupted { reason: "cancelled".into() });
        }
        while !cursor.is_done() {
            for dimension in dimensions {
                let value = cursor.value(dimension).as_str_coalesced();
                if value.contains(search_query) {
                    let mut row: ResultRow = AHashMap::new();
                    row.insert("dimension".to_string(), Value::String(dimension.clone()));
                    row.insert("value".to_string(), Value::String(value));
                    hits.push(row);
                    if hits.len() >= limit {
                        break 'outer;
                    }
                }
            }
            cursor.advance();
        }
    }
    Ok(hits)
}

fn run_segment_metadata(adapter: &StorageAdapter, _interval: Interval) -> EngineResult<Vec<ResultRow>> {
    let mut row: ResultRow = AHashMap::new();
    row.insert("row_count".to_string(), Value::Long(adapter.row_count() as i64));
    row.insert("min_time".to_string(), Value::Long(adapter.get_min_time()));
    row.insert("max_time".to_string(), Value::Long(adapter.get_max_time()));
    Ok(vec![row])
}
