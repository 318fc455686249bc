//! Incremental index (C3, spec §4.3): the concurrently-writable in-memory
//! row store that ingestion appends to and that a segment is eventually
//! built from.

pub mod aggregator;
pub mod dictionary;
pub mod index;
pub mod key;

pub use aggregator::{AggregatorSpec, HeapAggregator};
pub use index::{IncrementalIndex, IndexConfig, InputRow, InsertResult};
pub use key::TimeAndDims;
