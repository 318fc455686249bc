//! Query rewriting (spec §4.5 "Query rewriting"): expand the compound
//! query kinds — join, classify, partitioned group-by — into the plain
//! broadcast queries the executor and per-segment runner already know how
//! to run, plus a post-processor the caller applies once every branch's
//! rows are back. None of `Join`/`Classify`/`KMeansTag` ever reaches
//! `run_on_segment` directly (it rejects them) — this module is the only
//! place that takes them apart.

use super::merge::ResultRow;
use super::{Filter, JoinType, Query};
use crate::value::Value;
use ahash::{AHashMap, AHashSet};

/// Result of rewriting a `Join` query: a `UnionAll` of left/right
/// sub-queries (one pair per partition) plus the post-processor that
/// turns the union's per-branch rows back into joined rows.
pub struct JoinRewrite {
    pub branches: Query,
    pub post_processor: JoinPostProcessor,
}

/// Resolves Open Question #1 (spec §9): joins key on an ordered list of
/// column-name pairs rather than a single column, so multi-key equi-joins
/// are expressed directly instead of bolted on via a synthetic composite
/// key column.
pub struct JoinPostProcessor {
    pub join_type: JoinType,
    pub left_keys: Vec<String>,
    pub right_keys: Vec<String>,
}

impl JoinPostProcessor {
    /// `branches` is the union-all's per-branch row sets, in submission
    /// order: `[left_0, right_0, left_1, right_1, ...]`, one pair per
    /// partition. Each pair is joined independently and the results
    /// concatenated — partitioning the driving key range never changes
    /// which rows match, only how the work is split (spec §8 "join
    /// rewrite row count is independent of partitioning").
    pub fn apply(&self, branches: Vec<Vec<ResultRow>>) -> Vec<ResultRow> {
        let mut output = Vec::new();
        for pair in branches.chunks(2) {
            if let [left, right] = pair {
                output.extend(self.join_pair(left, right));
            }
        }
        output
    }

    fn join_pair(&self, left_rows: &[ResultRow], right_rows: &[ResultRow]) -> Vec<ResultRow> {
        let mut right_by_key: AHashMap<Vec<String>, Vec<&ResultRow>> = AHashMap::new();
        for row in right_rows {
            right_by_key.entry(self.key_of(row, &self.right_keys)).or_default().push(row);
        }

        let mut matched_right_keys: AHashSet<Vec<String>> = AHashSet::new();
        let mut out = Vec::new();

        for left in left_rows {
            let key = self.key_of(left, &self.left_keys);
            match right_by_key.get(&key) {
                Some(matches) => {
                    matched_right_keys.insert(key);
                    for right in matches {
                        out.push(merge_row(left, right));
                    }
                }
                None => {
                    if matches!(self.join_type, JoinType::Left | JoinType::Full) {
                        out.push(left.clone());
                    }
                }
            }
        }

        if matches!(self.join_type, JoinType::RightOuter | JoinType::Full) {
            for row in right_rows {
                let key = self.key_of(row, &self.right_keys);
                if !matched_right_keys.contains(&key) {
                    out.push(row.clone());
                }
            }
        }

        out
    }

    fn key_of(&self, row: &ResultRow, keys: &[String]) -> Vec<String> {
        keys.iter().map(|k| row.get(k).map(Value::as_str_coalesced).unwrap_or_default()).collect()
    }
}

fn merge_row(left: &ResultRow, right: &ResultRow) -> ResultRow {
    let mut merged = left.clone();
    for (k, v) in right {
        merged.entry(k.clone()).or_insert_with(|| v.clone());
    }
    merged
}

/// Rewrite a `Join` query into its branches and post-processor (spec
/// §4.5 step 1: "Join(left, right, joinKeys) rewrites to
/// UnionAll([left, right]) decorated with a JoinPostProcessor"). When
/// `partition_bounds` names more than one range over the left-side
/// driving key, each range gets its own left/right sub-query pair so the
/// branches can run — and be cancelled — independently (spec §6
/// `numPartition`/`scannerLen`).
pub fn rewrite_join(
    left: Query,
    right: Query,
    join_keys: Vec<(String, String)>,
    join_type: JoinType,
    num_partition: usize,
    partition_bounds: &[(String, String)],
) -> JoinRewrite {
    let (left_keys, right_keys): (Vec<String>, Vec<String>) = join_keys.into_iter().unzip();
    let driving_key = left_keys.first().cloned();

    let branches = if num_partition > 1 && !partition_bounds.is_empty() {
        match &driving_key {
            Some(dim) => {
                let mut queries = Vec::with_capacity(partition_bounds.len() * 2);
                for (lo, hi) in partition_bounds {
                    queries.push(left.clone().with_additional_filter(bound_range(dim, lo, hi)));
                    queries.push(right.clone());
                }
                Query::UnionAll { queries }
            }
            None => Query::UnionAll { queries: vec![left, right] },
        }
    } else {
        Query::UnionAll { queries: vec![left, right] }
    };

    JoinRewrite { branches, post_processor: JoinPostProcessor { join_type, left_keys, right_keys } }
}

/// `[lo, hi)` over `dimension`, used to slice a partitioned join's or
/// group-by's driving key range.
fn bound_range(dimension: &str, lo: &str, hi: &str) -> Filter {
    Filter::Bound {
        dimension: dimension.to_string(),
        lower: Some(lo.to_string()),
        lower_strict: false,
        upper: Some(hi.to_string()),
        upper_strict: true,
    }
}

/// Partitioned group-by rewrite (spec §4.5 "Partitioned group-by"): split
/// a group-by's first dimension into `partition_bounds.len()` ranged
/// sub-queries. Determinism of the merged result (spec §8 "group-by
/// determinism is independent of parallelism") follows directly from
/// reusing `merge_group_by`, which groups by key and is order-insensitive
/// until its final sort — running the partitions in any order, or not
/// partitioning at all, produces the same merged rows.
pub fn rewrite_partitioned_group_by(query: &Query, partition_bounds: &[(String, String)]) -> Vec<Query> {
    let Query::GroupBy { dimensions, .. } = query else {
        return vec![query.clone()];
    };
    if partition_bounds.len() <= 1 {
        return vec![query.clone()];
    }
    let Some(driving) = dimensions.first().map(|d| d.dimension.clone()) else {
        return vec![query.clone()];
    };
    partition_bounds.iter().map(|(lo, hi)| query.clone().with_additional_filter(bound_range(&driving, lo, hi))).collect()
}

/// Classify post-processing (spec §4.5 "Classify"): `ClassifyQuery(base,
/// classifier, featureField, tagColumn)` rewrites to `UnionAll([classifier,
/// base])`; the classifier branch's rows are read as an emitted model (a
/// `threshold`/`tag` table) and applied to every base row's
/// `featureField` to produce `tagColumn`.
pub struct ClassifyPostProcessor {
    pub feature_field: String,
    pub tag_column: String,
}

impl ClassifyPostProcessor {
    /// `branches[0]` is the classifier's rows, `branches[1]` is the
    /// base query's rows — the same two-branch shape `rewrite_classify`
    /// produces.
    pub fn apply(&self, branches: Vec<Vec<ResultRow>>) -> Vec<ResultRow> {
        let mut iter = branches.into_iter();
        let classifier_rows = iter.next().unwrap_or_default();
        let base_rows = iter.next().unwrap_or_default();

        let mut thresholds: Vec<(f64, String)> = classifier_rows
            .iter()
            .filter_map(|row| {
                let threshold = row.get("threshold")?.as_double();
                let tag = row.get("tag")?.as_str_coalesced();
                Some((threshold, tag))
            })
            .collect();
        thresholds.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        base_rows
            .into_iter()
            .map(|mut row| {
                let value = row.get(&self.feature_field).map(Value::as_double).unwrap_or(0.0);
                let tag = thresholds
                    .iter()
                    .rev()
                    .find(|(t, _)| value >= *t)
                    .map(|(_, tag)| tag.clone())
                    .unwrap_or_else(|| "unclassified".to_string());
                row.insert(self.tag_column.clone(), Value::String(tag));
                row
            })
            .collect()
    }
}

pub fn rewrite_classify(base: Query, classifier: Query, feature_field: String, tag_column: String) -> (Query, ClassifyPostProcessor) {
    (Query::UnionAll { queries: vec![classifier, base] }, ClassifyPostProcessor { feature_field, tag_column })
}

/// k-means tagging (spec §2 "post-processing operators ... k-means tag"):
/// unlike join/classify this is a plain decoration over `base`'s own
/// output, not a rewrite — there is no second sub-query to merge in.
/// Lloyd's algorithm seeded with the first `k` distinct rows so repeated
/// runs over the same input converge to the same clustering.
pub fn kmeans_tag(rows: Vec<ResultRow>, feature_fields: &[String], k: usize, max_iterations: usize, tag_column: &str) -> Vec<ResultRow> {
    if rows.is_empty() || k == 0 {
        return rows;
    }
    let features: Vec<Vec<f64>> =
        rows.iter().map(|row| feature_fields.iter().map(|f| row.get(f).map(Value::as_double).unwrap_or(0.0)).collect()).collect();
    let k = k.min(features.len());
    let mut centroids: Vec<Vec<f64>> = features.iter().take(k).cloned().collect();
    let mut assignments = vec![0usize; features.len()];

    for _ in 0..max_iterations.max(1) {
        let mut changed = false;
        for (i, point) in features.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| euclidean(point, a).partial_cmp(&euclidean(point, b)).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = features.iter().zip(&assignments).filter(|(_, &a)| a == cluster).map(|(f, _)| f).collect();
            if members.is_empty() {
                continue;
            }
            let dims = members[0].len();
            let mut mean = vec![0.0; dims];
            for member in &members {
                for d in 0..dims {
                    mean[d] += member[d];
                }
            }
            for value in mean.iter_mut() {
                *value /= members.len() as f64;
            }
            *centroid = mean;
        }

        if !changed {
            break;
        }
    }

    rows.into_iter()
        .zip(assignments)
        .map(|(mut row, cluster)| {
            row.insert(tag_column.to_string(), Value::String(format!("cluster-{cluster}")));
            row
        })
        .collect()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}
