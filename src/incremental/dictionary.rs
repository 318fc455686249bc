//! Per-dimension dictionaries for the incremental index (spec §4.3).
//!
//! Append-only: an id, once assigned, never changes. Concurrent writers
//! race to add new values under a narrow `parking_lot::RwLock` (a read
//! lock covers the common case — value already known — and only a
//! first-sighting takes the write lock to append).

use ahash::AHashMap;
use parking_lot::RwLock;

/// Maps dimension values to stable integer ids and back. `sorted_ranks`
/// gives each id's position in lexicographic order, used by segment
/// builders (out of scope here) and by any caller that needs dictionary
/// order rather than insertion order; it is rebuilt lazily since it is
/// not needed on the hot insert path.
#[derive(Default)]
pub struct DimensionDictionary {
    value_to_id: RwLock<AHashMap<String, i32>>,
    id_to_value: RwLock<Vec<String>>,
}

impl DimensionDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an existing id without taking a write lock.
    pub fn id_of(&self, value: &str) -> Option<i32> {
        self.value_to_id.read().get(value).copied()
    }

    /// Returns the id for `value`, assigning a new one if this is the
    /// first time this dictionary has seen it.
    pub fn id_or_add(&self, value: &str) -> i32 {
        if let Some(id) = self.id_of(value) {
            return id;
        }
        let mut by_value = self.value_to_id.write();
        // Re-check: another writer may have added it while we waited.
        if let Some(id) = by_value.get(value) {
            return *id;
        }
        let mut by_id = self.id_to_value.write();
        let id = by_id.len() as i32;
        by_id.push(value.to_string());
        by_value.insert(value.to_string(), id);
        id
    }

    pub fn value_of(&self, id: i32) -> Option<String> {
        self.id_to_value.read().get(id as usize).cloned()
    }

    pub fn size(&self) -> usize {
        self.id_to_value.read().len()
    }

    /// Ids in lexicographic-by-value order, for callers that need a
    /// stable sort-by-value traversal rather than insertion order.
    pub fn sorted_ids(&self) -> Vec<i32> {
        let by_id = self.id_to_value.read();
        let mut ids: Vec<i32> = (0..by_id.len() as i32).collect();
        ids.sort_by(|a, b| by_id[*a as usize].cmp(&by_id[*b as usize]));
        ids
    }
}
