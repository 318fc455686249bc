//! Reference-counted segment handles (spec §4.2 "Reference-counting
//! runner", §5 "Shared resource policy").
//!
//! Ownership model (spec §9): a segment handle is a shared resource whose
//! scoped acquisition is enforced by the language's own resource-release
//! primitive (`Drop`) rather than a manual increment/close-token pair —
//! the token the original design names is just the thing `Drop` releases
//! for us automatically on every exit path, including panics and early
//! returns from `?`.

use super::Segment;
use crate::error::EngineError;
use parking_lot::RwLock;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// A segment plus its liveness state. `retracted` is flipped once, after
/// which no new reference can be acquired — in-flight holders keep
/// running to completion, but `acquire` starts returning `MissingSegment`.
pub struct SegmentReference {
    segment: Arc<Segment>,
    retracted: Arc<RwLock<bool>>,
    live_refs: Arc<AtomicUsize>,
}

impl SegmentReference {
    pub fn new(segment: Arc<Segment>) -> Self {
        Self {
            segment,
            retracted: Arc::new(RwLock::new(false)),
            live_refs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Increment the reference count and hand back a scoped handle. Fails
    /// if the segment has already been retracted (spec §4.2: "a new
    /// increment fails if the segment has been retracted").
    pub fn acquire(&self) -> Result<SegmentHandle, EngineError> {
        if *self.retracted.read() {
            return Err(EngineError::MissingSegment { segment_id: self.segment.id.to_string() });
        }
        self.live_refs.fetch_add(1, Ordering::SeqCst);
        Ok(SegmentHandle { segment: self.segment.clone(), live_refs: self.live_refs.clone() })
    }

    /// Mark the segment retracted; existing handles remain valid until
    /// dropped, but no further `acquire` will succeed.
    pub fn retract(&self) {
        *self.retracted.write() = true;
    }

    pub fn live_ref_count(&self) -> usize {
        self.live_refs.load(Ordering::SeqCst)
    }
}

/// A held reference to a segment. Dropping it releases the reference on
/// every exit path — normal return, early `?`, or unwind — with no
/// opportunity for a caller to forget to call a manual `close()`.
pub struct SegmentHandle {
    segment: Arc<Segment>,
    live_refs: Arc<AtomicUsize>,
}

impl SegmentHandle {
    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }
}

impl Drop for SegmentHandle {
    fn drop(&mut self) {
        self.live_refs.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::granularity::Granularity;
    use crate::segment::{SegmentId, SegmentMetadata};
    use ahash::AHashMap;

    fn sample() -> Arc<Segment> {
        Arc::new(Segment::new(
            SegmentId {
                data_source: "t".into(),
                interval_start_millis: 0,
                interval_end_millis: 10,
                version: "v1".into(),
                partition_number: 0,
            },
            0,
            10,
            SegmentMetadata { aggregator_names: vec![], query_granularity: Granularity::All, rolled_up: false },
            vec![0, 1],
            AHashMap::new(),
        ))
    }

    #[test]
    fn acquire_fails_after_retract() {
        let reference = SegmentReference::new(sample());
        let handle = reference.acquire().unwrap();
        reference.retract();
        assert!(reference.acquire().is_err());
        drop(handle);
    }

    #[test]
    fn drop_releases_reference_on_every_exit_path() {
        let reference = SegmentReference::new(sample());
        {
            let _h1 = reference.acquire().unwrap();
            let _h2 = reference.acquire().unwrap();
            assert_eq!(reference.live_ref_count(), 2);
        }
        assert_eq!(reference.live_ref_count(), 0);
    }

    #[test]
    fn panic_during_hold_still_releases() {
        let reference = SegmentReference::new(sample());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _h = reference.acquire().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(reference.live_ref_count(), 0);
    }
}
