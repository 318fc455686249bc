//! Explicit execution pipeline (spec §9 design note, §4.5 execution
//! stack): an ordered list of named `Sequence<ResultRow> ->
//! Sequence<ResultRow>` transforms, composed left-to-right and driven by
//! `run`. Replaces the "runner wrapped in runner in runner" decorator
//! chain the design notes call out — the stages here are plain values you
//! can list, reorder, or test individually instead of objects nested at
//! construction time.
//!
//! The full outside-in stack from spec §4.5 is, top to bottom:
//! referenceCountingRunner -> perSegmentRunner -> preMergeDecoration ->
//! mergeResults -> postMergeDecoration -> finalizeResults ->
//! finalQueryDecoration. The first two stages are handled upstream of
//! this module (`segment::reference` for the handle's lifetime,
//! `runner::run_on_segment` per segment); `QueryPipeline` models the
//! remaining four plus an optional decoration stage.

use super::merge::ResultRow;
use super::post_aggregator::PostAggregator;
use super::sequence::Sequence;
use super::toolchest::QueryToolchest;
use std::sync::Arc;

pub type Stage = Box<dyn Fn(Sequence<ResultRow>) -> Sequence<ResultRow> + Send>;

/// An ordered, inspectable list of result-row transforms.
pub struct QueryPipeline {
    stages: Vec<(&'static str, Stage)>,
}

impl QueryPipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push(mut self, name: &'static str, stage: Stage) -> Self {
        self.stages.push((name, stage));
        self
    }

    /// Stage names in application order, useful for tests that assert the
    /// pipeline was assembled with the stages a query kind expects.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(name, _)| *name).collect()
    }

    pub fn run(self, input: Sequence<ResultRow>) -> Sequence<ResultRow> {
        self.stages.into_iter().fold(input, |seq, (_, stage)| stage(seq))
    }
}

impl Default for QueryPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the standard four-stage pipeline for one query's toolchest (spec
/// §4.5 steps 3-6). `finalize` is false for an inner branch of a
/// rewritten query (e.g. a join's left/right sub-query) whose rows still
/// need to pass through a post-processor before finalization makes sense.
pub fn build_pipeline(toolchest: Arc<dyn QueryToolchest>, post_aggregations: Vec<PostAggregator>, finalize: bool) -> QueryPipeline {
    let mut pipeline = QueryPipeline::new();

    let pre = toolchest.clone();
    pipeline = pipeline.push("preMergeDecoration", Box::new(move |seq| Sequence::from_vec(pre.pre_merge_decoration(seq.to_vec()))));

    let merge = toolchest.clone();
    pipeline = pipeline.push("mergeResults", Box::new(move |seq| Sequence::from_vec(merge.merge_results(seq.to_vec()))));

    let post = toolchest.clone();
    pipeline = pipeline.push("postMergeDecoration", Box::new(move |seq| Sequence::from_vec(post.post_merge_decoration(seq.to_vec()))));

    if finalize {
        let fin = toolchest;
        pipeline = pipeline.push(
            "finalizeResults",
            Box::new(move |seq| Sequence::from_vec(fin.finalize_results(seq.to_vec(), &post_aggregations))),
        );
    }

    pipeline
}
