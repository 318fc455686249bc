//! Segment & adapter (C2, spec §4.2): the immutable bundle of column
//! readers, wrapped behind a `StorageAdapter` that emits cursors.

pub mod adapter;
pub mod cursor;
pub mod granularity;
pub mod reference;

use crate::column::ColumnReader;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Content-addressed segment identity (spec §3: "a segment is
/// content-addressed by (dataSource, interval, version, partition-number)").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId {
    pub data_source: String,
    pub interval_start_millis: i64,
    pub interval_end_millis: i64,
    pub version: String,
    pub partition_number: u32,
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.data_source, self.interval_start_millis, self.interval_end_millis, self.version, self.partition_number
        )
    }
}

/// Aggregator specs, query granularity, and rollup flag that produced this
/// segment (spec §3: segment metadata).
#[derive(Debug, Clone)]
pub struct SegmentMetadata {
    pub aggregator_names: Vec<String>,
    pub query_granularity: granularity::Granularity,
    pub rolled_up: bool,
}

/// An immutable bundle: interval, column set, and metadata. The time
/// column is mandatory and is always named `__time`.
pub struct Segment {
    pub id: SegmentId,
    pub interval_start_millis: i64,
    pub interval_end_millis: i64,
    pub metadata: SegmentMetadata,
    columns: AHashMap<String, ColumnReader>,
    time_column: Arc<crate::column::numeric::NumericColumn>,
    row_count: usize,
}

impl Segment {
    pub fn new(
        id: SegmentId,
        interval_start_millis: i64,
        interval_end_millis: i64,
        metadata: SegmentMetadata,
        time_column: Vec<i64>,
        columns: AHashMap<String, ColumnReader>,
    ) -> Self {
        let row_count = time_column.len();
        Self {
            id,
            interval_start_millis,
            interval_end_millis,
            metadata,
            columns,
            time_column: Arc::new(crate::column::numeric::NumericColumn::Long(time_column)),
            row_count,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn get_min_time(&self) -> i64 {
        self.interval_start_millis
    }

    pub fn get_max_time(&self) -> i64 {
        self.interval_end_millis
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, c)| c.capabilities().dictionary_encoded)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, c)| !c.capabilities().dictionary_encoded)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnReader> {
        if name == "__time" {
            return None;
        }
        self.columns.get(name)
    }

    pub fn columns_ref(&self) -> &AHashMap<String, ColumnReader> {
        &self.columns
    }

    pub fn time_column(&self) -> &Arc<crate::column::numeric::NumericColumn> {
        &self.time_column
    }

    pub fn capabilities(&self, name: &str) -> Option<crate::column::capabilities::ColumnCapabilities> {
        self.columns.get(name).map(|c| c.capabilities())
    }
}
