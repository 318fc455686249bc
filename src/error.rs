//! Engine-wide error kinds.
//!
//! Every fallible path in this crate returns one flat enum instead of a
//! per-module error type. This mirrors the teacher crate's `BlockError`
//! (`src/core/block.rs`) — a single `thiserror`-derived enum with one
//! variant per failure kind — generalized to the kinds this engine raises
//! rather than block-lifecycle failures.

use thiserror::Error;

/// Errors produced anywhere in the query-execution engine.
///
/// Variants correspond one-to-one with the error kinds of the design
/// ("invalid-query", "parse-error", "missing-segment", "interrupted",
/// "capacity-exceeded", "internal"). Recoverable parse errors are absorbed
/// by the ingestion runner and counted rather than propagated; every other
/// variant terminates the sub-query and is handed to the merge consumer,
/// which cancels remaining siblings.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Unparseable or semantically inconsistent query: duplicate aggregator
    /// name, an unresolvable post-aggregator dependency, an unsupported
    /// data-source combination. Surfaced to the caller; never retried.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An input row could not be parsed during ingestion. Fatal unless the
    /// caller set `ignoreInvalidRows`, in which case the row is skipped and
    /// counted by the runner instead of raised here.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A segment handle could not be acquired because the segment was
    /// already retracted. Carries the descriptor so the broker can retry
    /// against an alternate replica.
    #[error("missing segment: {segment_id}")]
    MissingSegment {
        /// Content-addressed identifier of the segment that could not be acquired.
        segment_id: String,
    },

    /// Cancellation, timeout, or thread interruption. `TimeoutException`,
    /// `CancellationException`, and `InterruptedException` all collapse to
    /// this one kind; no partial result is ever returned alongside it.
    #[error("interrupted: {reason}")]
    Interrupted {
        /// Why execution was interrupted (e.g. "timeout", "cancelled").
        reason: String,
    },

    /// The incremental index exceeded `maxRowsInMemory` or
    /// `maxOccupationInMemory`. Fatal for that aggregation attempt; callers
    /// typically seal-and-retry with a smaller batch.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Invariant violation: a null cursor where one was expected,
    /// aggregator state corruption, or similar internal inconsistency.
    /// Always carries diagnostic context.
    #[error("internal error in query {query_id:?} segment {segment_id:?}: {message}")]
    Internal {
        /// Query id the failure occurred under, if known.
        query_id: Option<String>,
        /// Segment id the failure occurred under, if known.
        segment_id: Option<String>,
        /// Human-readable diagnostic.
        message: String,
    },
}

impl EngineError {
    /// Build an [`EngineError::Internal`] with no id context attached.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            query_id: None,
            segment_id: None,
            message: message.into(),
        }
    }

    /// True for error kinds a broker should retry rather than surface.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::MissingSegment { .. })
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::internal(error.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
