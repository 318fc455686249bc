//! `IncrementalIndex`: the in-memory, concurrently-writable row store a
//! segment is built from (spec §4.3).
//!
//! Writers race on the same fact key when two rows roll up together; the
//! facts map is a `DashMap` precisely so that race resolves as a
//! fine-grained per-shard lock rather than one mutex serializing every
//! insert in the index. Capacity accounting (`maxRowsInMemory` /
//! `maxOccupationInMemory`) gates only the creation of a *new* fact key —
//! merging into an existing key never grows row count or (to a first
//! approximation) memory, since a rollup merge replaces state in place.

use super::aggregator::{AggregatorSpec, HeapAggregator};
use super::dictionary::DimensionDictionary;
use super::key::TimeAndDims;
use crate::error::{EngineError, EngineResult};
use crate::segment::granularity::Granularity;
use crate::value::Value;
use ahash::AHashMap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct IndexConfig {
    pub rollup: bool,
    pub query_granularity: Granularity,
    pub max_rows_in_memory: usize,
    pub max_bytes_in_memory: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { rollup: true, query_granularity: Granularity::None, max_rows_in_memory: 1_000_000, max_bytes_in_memory: 256 * 1024 * 1024 }
    }
}

/// A row in progress: pre-dictionary-lookup dimension values plus raw
/// metric inputs, keyed by field name.
pub struct InputRow {
    pub timestamp: i64,
    pub dimensions: Vec<(String, Vec<String>)>,
    pub metrics: AHashMap<String, Value>,
}

pub struct InsertResult {
    pub row_count: usize,
    pub was_new_key: bool,
    pub bytes_in_memory: usize,
}

pub struct IncrementalIndex {
    config: IndexConfig,
    agg_specs: Vec<AggregatorSpec>,
    dimension_order: RwLock<Vec<String>>,
    dimension_index: RwLock<AHashMap<String, usize>>,
    dictionaries: DashMap<String, DimensionDictionary>,
    facts: DashMap<TimeAndDims, Vec<Box<dyn HeapAggregator>>>,
    row_count: AtomicUsize,
    bytes_in_memory: AtomicUsize,
    sequence: AtomicUsize,
}

impl IncrementalIndex {
    pub fn new(config: IndexConfig, agg_specs: Vec<AggregatorSpec>) -> Self {
        Self {
            config,
            agg_specs,
            dimension_order: RwLock::new(Vec::new()),
            dimension_index: RwLock::new(AHashMap::new()),
            dictionaries: DashMap::new(),
            facts: DashMap::new(),
            row_count: AtomicUsize::new(0),
            bytes_in_memory: AtomicUsize::new(0),
            sequence: AtomicUsize::new(0),
        }
    }

    pub fn is_rollup(&self) -> bool {
        self.config.rollup
    }

    pub fn row_count(&self) -> usize {
        self.row_count.load(Ordering::SeqCst)
    }

    pub fn bytes_in_memory(&self) -> usize {
        self.bytes_in_memory.load(Ordering::SeqCst)
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.dimension_order.read().clone()
    }

    fn dim_position(&self, name: &str) -> usize {
        if let Some(&pos) = self.dimension_index.read().get(name) {
            return pos;
        }
        let mut order = self.dimension_order.write();
        let mut index = self.dimension_index.write();
        if let Some(&pos) = index.get(name) {
            return pos;
        }
        let pos = order.len();
        order.push(name.to_string());
        index.insert(name.to_string(), pos);
        pos
    }

    fn dictionary_id(&self, dim: &str, value: &str) -> i32 {
        self.dictionaries.entry(dim.to_string()).or_insert_with(DimensionDictionary::new).id_or_add(value)
    }

    /// Insert one row (spec §4.3: rollup vs non-rollup insert path).
    /// Returns `CapacityExceeded` if the row would require a new fact key
    /// and the index is already at `maxRowsInMemory` or
    /// `maxOccupationInMemory` — existing keys can still absorb merges
    /// even when the index is otherwise full.
    pub fn add(&self, row: InputRow) -> EngineResult<InsertResult> {
        let bucketed_timestamp = self.config.query_granularity.truncate(row.timestamp);

        let mut dim_ids_per_dim: Vec<Vec<i32>> = vec![Vec::new(); self.dimension_order.read().len()];
        for (name, values) in &row.dimensions {
            let pos = self.dim_position(name);
            if pos >= dim_ids_per_dim.len() {
                dim_ids_per_dim.resize(pos + 1, Vec::new());
            }
            let mut ids: Vec<i32> = values.iter().map(|v| self.dictionary_id(name, v)).collect();
            ids.sort_unstable();
            ids.dedup();
            dim_ids_per_dim[pos] = ids;
        }

        let key = if self.config.rollup {
            TimeAndDims::rollup(bucketed_timestamp, dim_ids_per_dim)
        } else {
            let seq = self.sequence.fetch_add(1, Ordering::SeqCst) as u64;
            TimeAndDims::non_rollup(bucketed_timestamp, dim_ids_per_dim, seq)
        };

        match self.facts.entry(key) {
            Entry::Occupied(mut entry) => {
                let aggs = entry.get_mut();
                self.aggregate_into(aggs, &row.metrics);
                Ok(InsertResult {
                    row_count: self.row_count.load(Ordering::SeqCst),
                    was_new_key: false,
                    bytes_in_memory: self.bytes_in_memory(),
                })
            }
            Entry::Vacant(entry) => {
                if self.row_count.load(Ordering::SeqCst) >= self.config.max_rows_in_memory {
                    return Err(EngineError::CapacityExceeded(format!(
                        "maxRowsInMemory ({}) reached",
                        self.config.max_rows_in_memory
                    )));
                }
                let estimated_size = self.estimated_new_row_size();
                if self.bytes_in_memory.load(Ordering::SeqCst) + estimated_size > self.config.max_bytes_in_memory {
                    return Err(EngineError::CapacityExceeded("maxOccupationInMemory reached".into()));
                }

                let mut aggs: Vec<Box<dyn HeapAggregator>> = self.agg_specs.iter().map(|s| s.new_heap()).collect();
                self.aggregate_into(&mut aggs, &row.metrics);
                entry.insert(aggs);

                let row_count = self.row_count.fetch_add(1, Ordering::SeqCst) + 1;
                let bytes = self.bytes_in_memory.fetch_add(estimated_size, Ordering::SeqCst) + estimated_size;
                Ok(InsertResult { row_count, was_new_key: true, bytes_in_memory: bytes })
            }
        }
    }

    fn aggregate_into(&self, aggs: &mut [Box<dyn HeapAggregator>], metrics: &AHashMap<String, Value>) {
        for (agg, spec) in aggs.iter_mut().zip(&self.agg_specs) {
            match spec {
                AggregatorSpec::Count { .. } => agg.aggregate(&Value::Long(1)),
                _ => {
                    if let Some(field) = spec.field_name() {
                        if let Some(value) = metrics.get(field) {
                            agg.aggregate(value);
                        }
                    }
                }
            }
        }
    }

    fn estimated_new_row_size(&self) -> usize {
        let agg_bytes: usize = self.agg_specs.iter().map(|s| s.max_intermediate_size()).sum();
        let dim_bytes = self.dimension_order.read().len() * 16;
        agg_bytes + dim_bytes + 32
    }

    /// Sealed iteration contract (spec §4.3): a consistent snapshot of
    /// every fact, ordered by time then dimension ids. Facts inserted
    /// after this call is taken are not visible in the returned vector.
    pub fn snapshot(&self) -> Vec<(TimeAndDims, Vec<Value>)> {
        let mut rows: Vec<(TimeAndDims, Vec<Value>)> =
            self.facts.iter().map(|entry| (entry.key().clone(), entry.value().iter().map(|a| a.get()).collect())).collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    pub fn dictionary_value(&self, dim: &str, id: i32) -> Option<String> {
        self.dictionaries.get(dim).and_then(|d| d.value_of(id))
    }

    pub fn agg_specs(&self) -> &[AggregatorSpec] {
        &self.agg_specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: i64, dim_value: &str, metric: i64) -> InputRow {
        let mut metrics = AHashMap::new();
        metrics.insert("m".to_string(), Value::Long(metric));
        InputRow { timestamp: ts, dimensions: vec![("d".to_string(), vec![dim_value.to_string()])], metrics }
    }

    fn index(rollup: bool) -> IncrementalIndex {
        IncrementalIndex::new(
            IndexConfig { rollup, query_granularity: Granularity::None, max_rows_in_memory: 10, max_bytes_in_memory: 1 << 20 },
            vec![AggregatorSpec::LongSum { name: "m".into(), field_name: "m".into() }],
        )
    }

    #[test]
    fn rollup_merges_identical_time_and_dims() {
        let idx = index(true);
        idx.add(row(1000, "a", 5)).unwrap();
        let result = idx.add(row(1000, "a", 7)).unwrap();
        assert!(!result.was_new_key);
        assert_eq!(idx.row_count(), 1);
        let snapshot = idx.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1[0], Value::Long(12));
    }

    #[test]
    fn non_rollup_keeps_every_row_distinct() {
        let idx = index(false);
        idx.add(row(1000, "a", 5)).unwrap();
        idx.add(row(1000, "a", 7)).unwrap();
        assert_eq!(idx.row_count(), 2);
        assert_eq!(idx.snapshot().len(), 2);
    }

    #[test]
    fn distinct_dims_do_not_merge() {
        let idx = index(true);
        idx.add(row(1000, "a", 5)).unwrap();
        idx.add(row(1000, "b", 7)).unwrap();
        assert_eq!(idx.row_count(), 2);
    }

    #[test]
    fn capacity_exceeded_on_new_key_past_max_rows() {
        let idx = IncrementalIndex::new(
            IndexConfig { rollup: true, query_granularity: Granularity::None, max_rows_in_memory: 1, max_bytes_in_memory: 1 << 20 },
            vec![AggregatorSpec::LongSum { name: "m".into(), field_name: "m".into() }],
        );
        idx.add(row(1000, "a", 1)).unwrap();
        let err = idx.add(row(1000, "b", 1)).unwrap_err();
        assert!(matches!(err, EngineError::CapacityExceeded(_)));
    }

    #[test]
    fn merge_into_existing_key_proceeds_even_when_index_is_full() {
        let idx = IncrementalIndex::new(
            IndexConfig { rollup: true, query_granularity: Granularity::None, max_rows_in_memory: 1, max_bytes_in_memory: 1 << 20 },
            vec![AggregatorSpec::LongSum { name: "m".into(), field_name: "m".into() }],
        );
        idx.add(row(1000, "a", 1)).unwrap();
        let result = idx.add(row(1000, "a", 1)).unwrap();
        assert!(!result.was_new_key);
        assert_eq!(idx.row_count(), 1);
    }

    #[test]
    fn snapshot_is_ordered_by_time_then_dims() {
        let idx = index(true);
        idx.add(row(2000, "z", 1)).unwrap();
        idx.add(row(1000, "a", 1)).unwrap();
        idx.add(row(1000, "b", 1)).unwrap();
        let snapshot = idx.snapshot();
        let times: Vec<i64> = snapshot.iter().map(|(k, _)| k.bucketed_timestamp).collect();
        assert_eq!(times, vec![1000, 1000, 2000]);
    }

    #[test]
    fn concurrent_inserts_to_the_same_key_all_roll_up() {
        use std::sync::Arc;
        let idx = Arc::new(index(true));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let idx = idx.clone();
                std::thread::spawn(move || idx.add(row(1000, "a", 1)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(idx.row_count(), 1);
        let snapshot = idx.snapshot();
        assert_eq!(snapshot[0].1[0], Value::Long(8));
    }
}
