//! Bitmap index over a dictionary-encoded column: point/set-membership
//! predicates resolve exactly (union/complement of per-id bitmaps), range
//! predicates resolve exactly too since the dictionary is sorted and ids
//! can be binary-searched into `[startIndex, endIndex)` (spec §4.4).

use super::Predicate;
use crate::column::bitmap::{BitmapFactory, ImmutableBitmap};
use crate::column::dictionary::DictionaryEncodedColumn;

pub struct BitmapIndex<'a> {
    column: &'a DictionaryEncodedColumn,
}

impl<'a> BitmapIndex<'a> {
    pub fn new(column: &'a DictionaryEncodedColumn) -> Self {
        Self { column }
    }

    /// Returns `(bitmap, exact)`. Point/set-membership/between/range are
    /// all exact over a dictionary-encoded column because every match is
    /// resolved by dictionary membership, not approximation.
    pub fn filter_for(&self, predicate: &Predicate) -> (ImmutableBitmap, bool) {
        match predicate {
            Predicate::Point(v) => {
                let id = self.column.lookup_id(v);
                (self.column.get_bitmap(id), true)
            }
            Predicate::SetMembership(values) => {
                let bitmaps: Vec<ImmutableBitmap> = values
                    .iter()
                    .map(|v| self.column.get_bitmap(self.column.lookup_id(v)))
                    .collect();
                (BitmapFactory::union_all(bitmaps.iter()), true)
            }
            Predicate::Between(lo, hi) => self.range_bitmap(Some(lo), false, Some(hi), false),
            Predicate::Range { lower, lower_strict, upper, upper_strict } => {
                self.range_bitmap(lower.as_deref(), *lower_strict, upper.as_deref(), *upper_strict)
            }
        }
    }

    fn range_bitmap(
        &self,
        lower: Option<&str>,
        lower_strict: bool,
        upper: Option<&str>,
        upper_strict: bool,
    ) -> (ImmutableBitmap, bool) {
        let dict = self.column.get_dictionary();
        let start = match lower {
            None => 0,
            Some(l) => {
                let idx = dict.partition_point(|v| v.as_ref() < l);
                if lower_strict && dict.get(idx).map(|v| v.as_ref() == l).unwrap_or(false) {
                    idx + 1
                } else {
                    idx
                }
            }
        };
        let end = match upper {
            None => dict.len(),
            Some(u) => {
                let idx = dict.partition_point(|v| v.as_ref() <= u);
                if upper_strict && dict.get(idx.saturating_sub(1)).map(|v| v.as_ref() == u).unwrap_or(false) {
                    idx.saturating_sub(1)
                } else {
                    idx
                }
            }
        };

        if start >= end {
            return (ImmutableBitmap::empty(), true);
        }

        let bitmaps: Vec<ImmutableBitmap> =
            (start..end).map(|id| self.column.get_bitmap(id as i32)).collect();
        (BitmapFactory::union_all(bitmaps.iter()), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col() -> DictionaryEncodedColumn {
        let rows: Vec<Option<String>> = vec!["a", "b", "c", "a", "b"]
            .into_iter()
            .map(|s| Some(s.to_string()))
            .collect();
        DictionaryEncodedColumn::build_single(&rows)
    }

    #[test]
    fn point_predicate_exact() {
        let c = col();
        let idx = BitmapIndex::new(&c);
        let (bm, exact) = idx.filter_for(&Predicate::Point("a".into()));
        assert!(exact);
        assert_eq!(bm.cardinality(), 2);
    }

    #[test]
    fn range_predicate_returns_sorted_window() {
        let c = col();
        let idx = BitmapIndex::new(&c);
        let (bm, exact) = idx.filter_for(&Predicate::Range {
            lower: Some("a".into()),
            lower_strict: true,
            upper: Some("c".into()),
            upper_strict: false,
        });
        assert!(exact);
        // excludes "a" (strict), includes "b" and "c"
        assert_eq!(bm.cardinality(), 3);
    }

    #[test]
    fn missing_value_returns_empty() {
        let c = col();
        let idx = BitmapIndex::new(&c);
        let (bm, _) = idx.filter_for(&Predicate::Point("zzz".into()));
        assert!(bm.is_empty());
    }
}
