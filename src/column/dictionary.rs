//! Dictionary-encoded string column (spec §3, §4.1).
//!
//! A sorted-by-id dictionary of distinct values, with per-row either a
//! single id or a multi-value id list, and optionally a bitmap per id.
//! Grounded in the teacher's `categories/compression/dictionary_encoding.rs`
//! (value → code mapping, fallback-on-full behavior) generalized from a
//! one-shot simulator pass into a persistent, queryable column: ids are
//! stable for the lifetime of the column, `lookupName`/`lookupId` are O(1)
//! and O(log n) respectively, and each id carries its row bitmap.

use super::bitmap::ImmutableBitmap;
use super::capabilities::ColumnCapabilities;
use crate::value::ValueType;
use ahash::AHashMap;

/// Sentinel returned by `lookup_id` for a value never seen by this
/// dictionary (spec §8: "lookupId(missing) = -1").
pub const ABSENT_ID: i32 = -1;

/// Sort first-sight-ordered distinct values lexicographically and return
/// `(sorted dictionary, value -> sorted id, old id -> sorted id)`.
fn sort_and_remap(first_sight: Vec<Box<str>>) -> (Vec<Box<str>>, AHashMap<Box<str>, u32>, Vec<u32>) {
    let mut order: Vec<u32> = (0..first_sight.len() as u32).collect();
    order.sort_by(|&a, &b| first_sight[a as usize].cmp(&first_sight[b as usize]));

    let mut remap = vec![0u32; first_sight.len()];
    for (new_id, &old_id) in order.iter().enumerate() {
        remap[old_id as usize] = new_id as u32;
    }

    let dictionary: Vec<Box<str>> = order.into_iter().map(|old_id| first_sight[old_id as usize].clone()).collect();
    let mut reverse = AHashMap::with_capacity(dictionary.len());
    for (new_id, v) in dictionary.iter().enumerate() {
        reverse.insert(v.clone(), new_id as u32);
    }

    (dictionary, reverse, remap)
}

#[derive(Debug, Clone)]
pub struct DictionaryEncodedColumn {
    /// id -> value, sorted by id (insertion order at build time).
    dictionary: Vec<Box<str>>,
    /// value -> id, for O(1)-average lookupId.
    reverse: AHashMap<Box<str>, u32>,
    /// Per-row single-value ids (empty if multi-valued).
    single_rows: Vec<i32>,
    /// Per-row multi-value id lists (empty if single-valued).
    multi_rows: Vec<Vec<i32>>,
    /// Per-id row bitmap, built once at segment-write time.
    bitmaps: Vec<ImmutableBitmap>,
    multi_valued: bool,
}

impl DictionaryEncodedColumn {
    /// Build a single-valued dictionary-encoded column from row values.
    /// Ids are assigned in first-sight order during the scan, then the
    /// dictionary is sorted lexicographically and every id remapped to its
    /// sorted rank — `range_index.rs`'s `partition_point` bound-filter
    /// dispatch relies on the dictionary being sorted by id.
    pub fn build_single(rows: &[Option<String>]) -> Self {
        let mut first_sight: Vec<Box<str>> = Vec::new();
        let mut first_sight_reverse: AHashMap<Box<str>, u32> = AHashMap::new();
        let mut raw_rows = Vec::with_capacity(rows.len());

        for row in rows {
            let v = row.clone().unwrap_or_default();
            let id = *first_sight_reverse.entry(v.clone().into_boxed_str()).or_insert_with(|| {
                let id = first_sight.len() as u32;
                first_sight.push(v.into_boxed_str());
                id
            });
            raw_rows.push(id);
        }

        let (dictionary, reverse, remap) = sort_and_remap(first_sight);
        let single_rows: Vec<i32> = raw_rows.iter().map(|&old| remap[old as usize] as i32).collect();

        let mut bitmaps = vec![ImmutableBitmap::empty(); dictionary.len()];
        for (row_idx, &id) in single_rows.iter().enumerate() {
            if id >= 0 {
                let mut bm = std::mem::take(&mut bitmaps[id as usize]);
                bm.0.insert(row_idx as u32);
                bitmaps[id as usize] = bm;
            }
        }

        Self {
            dictionary,
            reverse,
            single_rows,
            multi_rows: Vec::new(),
            bitmaps,
            multi_valued: false,
        }
    }

    /// Build a multi-valued dictionary-encoded column. Same sort-and-remap
    /// treatment as `build_single` — see that doc comment.
    pub fn build_multi(rows: &[Vec<String>]) -> Self {
        let mut first_sight: Vec<Box<str>> = Vec::new();
        let mut first_sight_reverse: AHashMap<Box<str>, u32> = AHashMap::new();
        let mut raw_rows: Vec<Vec<u32>> = Vec::with_capacity(rows.len());

        for row in rows {
            let mut ids = Vec::with_capacity(row.len());
            for v in row {
                let id = *first_sight_reverse.entry(v.clone().into_boxed_str()).or_insert_with(|| {
                    let id = first_sight.len() as u32;
                    first_sight.push(v.clone().into_boxed_str());
                    id
                });
                ids.push(id);
            }
            raw_rows.push(ids);
        }

        let (dictionary, reverse, remap) = sort_and_remap(first_sight);
        let multi_rows: Vec<Vec<i32>> = raw_rows
            .iter()
            .map(|ids| ids.iter().map(|&old| remap[old as usize] as i32).collect())
            .collect();

        let mut bitmaps = vec![ImmutableBitmap::empty(); dictionary.len()];
        for (row_idx, ids) in multi_rows.iter().enumerate() {
            for &id in ids {
                let mut bm = std::mem::take(&mut bitmaps[id as usize]);
                bm.0.insert(row_idx as u32);
                bitmaps[id as usize] = bm;
            }
        }

        Self {
            dictionary,
            reverse,
            single_rows: Vec::new(),
            multi_rows,
            bitmaps,
            multi_valued: true,
        }
    }

    pub fn capabilities(&self) -> ColumnCapabilities {
        let mut caps = ColumnCapabilities::new(ValueType::Dimension).dictionary_encoded().with_bitmap_index();
        if self.multi_valued {
            caps = caps.multi_valued();
        }
        caps
    }

    pub fn length(&self) -> usize {
        if self.multi_valued {
            self.multi_rows.len()
        } else {
            self.single_rows.len()
        }
    }

    pub fn cardinality(&self) -> usize {
        self.dictionary.len()
    }

    pub fn get_dictionary(&self) -> &[Box<str>] {
        &self.dictionary
    }

    /// `lookupId(value) -> -1 | id`.
    pub fn lookup_id(&self, value: &str) -> i32 {
        self.reverse.get(value).map(|&id| id as i32).unwrap_or(ABSENT_ID)
    }

    pub fn lookup_name(&self, id: i32) -> Option<&str> {
        if id < 0 {
            return None;
        }
        self.dictionary.get(id as usize).map(|s| s.as_ref())
    }

    pub fn get_single_value_row(&self, offset: usize) -> i32 {
        self.single_rows.get(offset).copied().unwrap_or(ABSENT_ID)
    }

    pub fn get_multi_value_row(&self, offset: usize) -> &[i32] {
        self.multi_rows.get(offset).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// `getBitmap(id) -> ImmutableBitmap`.
    pub fn get_bitmap(&self, id: i32) -> ImmutableBitmap {
        if id < 0 {
            return ImmutableBitmap::empty();
        }
        self.bitmaps.get(id as usize).cloned().unwrap_or_else(ImmutableBitmap::empty)
    }
}
