//! Text (inverted, "lucene-like") index: only answers exact point/range
//! queries over tokenized text; anything else routes to the generic
//! matcher (spec §4.4 edge cases: "Text-index only supports exact-kind
//! point/range queries; non-text predicates route to the generic matcher").

use super::Predicate;
use crate::column::bitmap::{BitmapFactory, ImmutableBitmap};
use ahash::AHashMap;

pub struct TextIndex {
    postings: AHashMap<String, ImmutableBitmap>,
}

impl TextIndex {
    pub fn build(rows: &[String]) -> Self {
        let mut postings: AHashMap<String, ImmutableBitmap> = AHashMap::new();
        for (row_idx, text) in rows.iter().enumerate() {
            for token in text.split_whitespace() {
                postings
                    .entry(token.to_lowercase())
                    .or_insert_with(ImmutableBitmap::empty)
                    .0
                    .insert(row_idx as u32);
            }
        }
        Self { postings }
    }

    /// Returns `None` when `predicate` is not a point or set-membership
    /// query over token text — callers must fall back to the generic
    /// matcher in that case.
    pub fn filter_for(&self, predicate: &Predicate) -> Option<(ImmutableBitmap, bool)> {
        match predicate {
            Predicate::Point(token) => Some((
                self.postings.get(&token.to_lowercase()).cloned().unwrap_or_else(ImmutableBitmap::empty),
                true,
            )),
            Predicate::SetMembership(tokens) => {
                let bitmaps: Vec<ImmutableBitmap> = tokens
                    .iter()
                    .filter_map(|t| self.postings.get(&t.to_lowercase()).cloned())
                    .collect();
                Some((BitmapFactory::union_all(bitmaps.iter()), true))
            }
            Predicate::Range { .. } | Predicate::Between(..) => None,
        }
    }
}
