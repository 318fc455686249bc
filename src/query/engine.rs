//! Top-level query engine (spec §4.5, §9): the one entry point that ties
//! segment discovery, query rewriting, bounded-parallel per-segment
//! execution, and the result pipeline together. Generalizes the
//! register-resources-then-run-a-request shape of a DAG execution engine
//! (`register_segment` stands in for wiring a node into a graph;
//! `execute` stands in for running the graph) to a column-store query
//! model instead of a block graph.

use super::context::QueryContext;
use super::merge::ResultRow;
use super::pipeline::build_pipeline;
use super::rewrite;
use super::runner::run_on_segment;
use super::sequence::Sequence;
use super::toolchest::{toolchest_for, QueryToolchest};
use super::watcher::{CancellationToken, QueryWatcher};
use super::Query;
use crate::error::{EngineError, EngineResult};
use crate::query::context::EngineConfig;
use crate::query::executor::Executor;
use crate::segment::reference::SegmentReference;
use dashmap::DashMap;
use std::sync::Arc;

/// Segments grouped by data source — the set a broadcast query scans.
#[derive(Default)]
pub struct SegmentCatalog {
    by_data_source: DashMap<String, Vec<Arc<SegmentReference>>>,
}

impl SegmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, data_source: impl Into<String>, reference: Arc<SegmentReference>) {
        self.by_data_source.entry(data_source.into()).or_default().push(reference);
    }

    fn segments_for(&self, data_source: &str) -> Vec<Arc<SegmentReference>> {
        self.by_data_source.get(data_source).map(|entry| entry.value().clone()).unwrap_or_default()
    }
}

pub struct QueryEngine {
    catalog: SegmentCatalog,
    executor: Executor,
    watcher: QueryWatcher,
}

impl QueryEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self { catalog: SegmentCatalog::new(), executor: Executor::new(config), watcher: QueryWatcher::new() }
    }

    pub fn register_segment(&self, data_source: impl Into<String>, reference: Arc<SegmentReference>) {
        self.catalog.register(data_source, reference);
    }

    /// Cancel an in-flight query by id (spec §5 "Query watcher").
    pub fn cancel(&self, query_id: &str) {
        self.watcher.cancel(query_id);
    }

    /// Run a query to completion: rewrite if it is a composite kind, fan
    /// out to every overlapping segment with bounded parallelism, merge,
    /// and finalize (spec §4.5 execution stack).
    pub async fn execute(&self, query: &Query, context: &QueryContext) -> EngineResult<Vec<ResultRow>> {
        let token = self.watcher.register(&context.query_id);
        let result = self.run(query, context, &token).await;
        self.watcher.deregister(&context.query_id);
        result
    }

    fn run<'a>(
        &'a self,
        query: &'a Query,
        context: &'a QueryContext,
        token: &'a CancellationToken,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<Vec<ResultRow>>> + Send + 'a>> {
        Box::pin(async move {
            if token.is_cancelled() {
                return Err(EngineError::Interrupted { reason: "cancelled before execution".into() });
            }

            match query {
                Query::Join { left, right, join_keys, join_type, num_partition, partition_bounds } => {
                    let rewritten =
                        rewrite::rewrite_join((**left).clone(), (**right).clone(), join_keys.clone(), *join_type, *num_partition, partition_bounds);
                    let branches = self.run_branches(&rewritten.branches, context, token).await?;
                    Ok(rewritten.post_processor.apply(branches))
                }
                Query::Classify { base, classifier, feature_field, tag_column } => {
                    let (union, post_processor) =
                        rewrite::rewrite_classify((**base).clone(), (**classifier).clone(), feature_field.clone(), tag_column.clone());
                    let branches = self.run_branches(&union, context, token).await?;
                    Ok(post_processor.apply(branches))
                }
                Query::KMeansTag { base, k, feature_fields, max_iterations } => {
                    let rows = self.run(base, context, token).await?;
                    Ok(rewrite::kmeans_tag(rows, feature_fields, *k, *max_iterations, "cluster"))
                }
                Query::UnionAll { .. } => Ok(self.run_branches(query, context, token).await?.into_iter().flatten().collect()),
                _ => self.run_broadcast(query, context, token).await,
            }
        })
    }

    /// Run every sub-query of a `UnionAll`, keeping each branch's rows
    /// separate — the shape join/classify post-processors need to tell
    /// "left" from "right" or "classifier" from "base".
    fn run_branches<'a>(
        &'a self,
        union: &'a Query,
        context: &'a QueryContext,
        token: &'a CancellationToken,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = EngineResult<Vec<Vec<ResultRow>>>> + Send + 'a>> {
        Box::pin(async move {
            let Query::UnionAll { queries } = union else {
                return Ok(vec![self.run(union, context, token).await?]);
            };
            let mut branches = Vec::with_capacity(queries.len());
            for sub_query in queries {
                branches.push(self.run(sub_query, context, token).await?);
            }
            Ok(branches)
        })
    }

    async fn run_broadcast(&self, query: &Query, _context: &QueryContext, token: &CancellationToken) -> EngineResult<Vec<ResultRow>> {
        let data_source = query.data_source().ok_or_else(|| EngineError::InvalidQuery("broadcast query has no data source".into()))?;
        let interval = query.interval();
        let references = self.catalog.segments_for(data_source);

        let mut handles = Vec::with_capacity(references.len());
        for reference in &references {
            if let Some(interval) = interval {
                // Skip segments that cannot overlap the requested window
                // rather than handing them to a cursor that would find
                // nothing — `acquire()` still establishes the reference
                // count for every segment actually scanned.
                let probe = reference.acquire()?;
                let overlaps =
                    probe.segment().interval_start_millis < interval.end_millis && probe.segment().interval_end_millis > interval.start_millis;
                if !overlaps {
                    continue;
                }
                handles.push(probe);
            } else {
                handles.push(reference.acquire()?);
            }
        }

        let query_owned = query.clone();
        let works: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                let query_owned = query_owned.clone();
                let token = token.clone();
                async move { run_on_segment(&query_owned, &handle, &token) }
            })
            .collect();

        let mut partials = Vec::new();
        for outcome in self.executor.run_all(works).await {
            partials.extend(outcome??);
        }

        let toolchest: Arc<dyn QueryToolchest> = Arc::from(toolchest_for(query));
        let pipeline = build_pipeline(toolchest, query.post_aggregations().to_vec(), true);
        Ok(pipeline.run(Sequence::from_vec(partials)).to_vec())
    }
}
