//! Per-kind merge algorithms (spec §4.5): combine the per-segment partial
//! results of a broadcast query into one ordered result set. Each
//! aggregator field is recombined through the same `AggregatorSpec`
//! that produced it, rather than a numeric-type-specific merge function,
//! so adding an aggregator kind never requires touching merge code.

use crate::incremental::AggregatorSpec;
use crate::query::{HavingSpec, LimitSpec, OrderByColumn};
use crate::value::Value;
use ahash::AHashMap;
use std::cmp::Ordering;

pub type ResultRow = AHashMap<String, Value>;

/// Re-run one aggregator's combining step over two already-aggregated
/// values — the cross-segment counterpart of `IncrementalIndex`'s
/// same-key rollup merge.
pub fn combine_aggregator_values(spec: &AggregatorSpec, a: &Value, b: &Value) -> Value {
    let mut agg = spec.new_heap();
    agg.aggregate(a);
    agg.aggregate(b);
    agg.get()
}

fn group_key(row: &ResultRow, key_fields: &[String]) -> Vec<String> {
    key_fields.iter().map(|f| row.get(f).map(Value::as_str_coalesced).unwrap_or_default()).collect()
}

/// Merge rows sharing the same `key_fields` values by recombining every
/// field named in `aggs`; non-key, non-aggregator fields are taken from
/// the first row seen for that key (used for e.g. a carried dimension
/// spelling).
pub fn merge_grouped(rows: Vec<ResultRow>, key_fields: &[String], aggs: &[AggregatorSpec]) -> Vec<ResultRow> {
    let mut grouped: Vec<(Vec<String>, ResultRow)> = Vec::new();
    let mut index: AHashMap<Vec<String>, usize> = AHashMap::new();

    for row in rows {
        let key = group_key(&row, key_fields);
        match index.get(&key) {
            Some(&pos) => {
                let existing = &mut grouped[pos].1;
                for spec in aggs {
                    let field = spec.name();
                    if let (Some(existing_value), Some(incoming_value)) = (existing.get(field).cloned(), row.get(field)) {
                        existing.insert(field.to_string(), combine_aggregator_values(spec, &existing_value, incoming_value));
                    } else if let Some(incoming_value) = row.get(field) {
                        existing.insert(field.to_string(), incoming_value.clone());
                    }
                }
            }
            None => {
                index.insert(key.clone(), grouped.len());
                grouped.push((key, row));
            }
        }
    }

    grouped.into_iter().map(|(_, row)| row).collect()
}

/// Timeseries merge (spec §4.5, §8 scenario 1): group by `__time`,
/// combine aggregator fields, then order by timestamp.
pub fn merge_timeseries(rows: Vec<ResultRow>, aggs: &[AggregatorSpec], descending: bool, limit: Option<usize>) -> Vec<ResultRow> {
    let mut merged = merge_grouped(rows, &["__time".to_string()], aggs);
    merged.sort_by(|a, b| {
        let ta = a.get("__time").map(Value::as_long).unwrap_or(0);
        let tb = b.get("__time").map(Value::as_long).unwrap_or(0);
        if descending {
            tb.cmp(&ta)
        } else {
            ta.cmp(&tb)
        }
    });
    if let Some(limit) = limit {
        merged.truncate(limit);
    }
    merged
}

/// TopN merge (spec §8 scenario 2): group by the dimension's output
/// name, combine aggregator fields, sort descending by `metric`, keep
/// the top `threshold`.
pub fn merge_top_n(rows: Vec<ResultRow>, dimension_output: &str, metric: &str, threshold: usize, aggs: &[AggregatorSpec]) -> Vec<ResultRow> {
    let mut merged = merge_grouped(rows, &[dimension_output.to_string()], aggs);
    merged.sort_by(|a, b| {
        let va = a.get(metric).map(Value::as_double).unwrap_or(0.0);
        let vb = b.get(metric).map(Value::as_double).unwrap_or(0.0);
        vb.partial_cmp(&va).unwrap_or(Ordering::Equal)
    });
    merged.truncate(threshold);
    merged
}

/// GroupBy merge (spec §8 scenario 3): group by the composite dimension
/// key, combine aggregator fields, apply `having`, then `limit_spec`'s
/// ordering and row cap. Determinism of the merged result is independent
/// of how partials were parallelized, since grouping is keyed and
/// order-insensitive until the final sort.
pub fn merge_group_by(
    rows: Vec<ResultRow>,
    dimension_outputs: &[String],
    aggs: &[AggregatorSpec],
    having: Option<&HavingSpec>,
    limit_spec: Option<&LimitSpec>,
) -> Vec<ResultRow> {
    let mut merged = merge_grouped(rows, dimension_outputs, aggs);

    if let Some(having) = having {
        merged.retain(|row| having.matches(row));
    }

    if let Some(limit_spec) = limit_spec {
        merged.sort_by(|a, b| compare_by_order_columns(a, b, &limit_spec.columns));
        if let Some(limit) = limit_spec.limit {
            merged.truncate(limit);
        }
    }

    merged
}

fn compare_by_order_columns(a: &ResultRow, b: &ResultRow, columns: &[OrderByColumn]) -> Ordering {
    for column in columns {
        let va = a.get(&column.dimension);
        let vb = b.get(&column.dimension);
        let ordering = va.partial_cmp(&vb).unwrap_or(Ordering::Equal);
        let ordering = if column.descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Select/Stream/Scan merge: a concatenation of per-segment row batches,
/// ordered by time (descending if the query asked for it), with an
/// optional row cap.
pub fn merge_row_batches(mut rows: Vec<ResultRow>, descending: bool, limit: Option<usize>) -> Vec<ResultRow> {
    rows.sort_by(|a, b| {
        let ta = a.get("__time").map(Value::as_long).unwrap_or(0);
        let tb = b.get("__time").map(Value::as_long).unwrap_or(0);
        if descending {
            tb.cmp(&ta)
        } else {
            ta.cmp(&tb)
        }
    });
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

/// UnionAll merge: simple concatenation, no dedup or reordering — each
/// branch's rows are already ordered by its own query.
pub fn merge_union_all(branches: Vec<Vec<ResultRow>>) -> Vec<ResultRow> {
    branches.into_iter().flatten().collect()
}
