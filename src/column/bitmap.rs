//! Bitmap factory (spec §4.1).
//!
//! All bitmaps are Roaring-compatible sets of row ids. Rather than
//! hand-rolling the run/array/bitset hybrid encoding, this wraps
//! `roaring::RoaringBitmap`, whose array container already gives the
//! small-cardinality escape encoding spec §4.1 describes. What this module
//! adds on top is the associative/commutative n-ary union and intersection
//! spec §4.1 calls for, implemented over a single mutable accumulator so
//! folding many bitmaps together stays linear instead of quadratic.

use roaring::RoaringBitmap;
use std::ops::{BitAnd, BitOr};

/// An immutable set of row ids. Cheap to clone (Roaring bitmaps are
/// reference-counted-friendly data; we clone the underlying structure,
/// which is itself compact).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImmutableBitmap(pub RoaringBitmap);

impl ImmutableBitmap {
    pub fn empty() -> Self {
        ImmutableBitmap(RoaringBitmap::new())
    }

    /// All rows `[0, num_rows)` set — used when a predicate has no
    /// bitmap-supported leaf and the cursor must fall back to a full-range
    /// offset (spec §4.2 step 3).
    pub fn all(num_rows: u32) -> Self {
        let mut bm = RoaringBitmap::new();
        bm.insert_range(0..num_rows);
        ImmutableBitmap(bm)
    }

    pub fn single(row: u32) -> Self {
        let mut bm = RoaringBitmap::new();
        bm.insert(row);
        ImmutableBitmap(bm)
    }

    pub fn from_rows(rows: impl IntoIterator<Item = u32>) -> Self {
        ImmutableBitmap(rows.into_iter().collect())
    }

    pub fn contains(&self, row: u32) -> bool {
        self.0.contains(row)
    }

    pub fn cardinality(&self) -> u64 {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter()
    }

    pub fn union(&self, other: &ImmutableBitmap) -> ImmutableBitmap {
        ImmutableBitmap(&self.0 | &other.0)
    }

    pub fn intersect(&self, other: &ImmutableBitmap) -> ImmutableBitmap {
        ImmutableBitmap(&self.0 & &other.0)
    }

    /// Complement within `[0, num_rows)`.
    pub fn complement(&self, num_rows: u32) -> ImmutableBitmap {
        let all = RoaringBitmap::from_sorted_iter(0..num_rows).expect("sorted range");
        ImmutableBitmap(&all - &self.0)
    }
}

impl BitOr for &ImmutableBitmap {
    type Output = ImmutableBitmap;
    fn bitor(self, rhs: Self) -> ImmutableBitmap {
        self.union(rhs)
    }
}

impl BitAnd for &ImmutableBitmap {
    type Output = ImmutableBitmap;
    fn bitand(self, rhs: Self) -> ImmutableBitmap {
        self.intersect(rhs)
    }
}

/// Boolean combinators over many bitmaps at once, folding into a single
/// accumulator rather than pairwise-combining (which would re-materialize
/// an intermediate bitmap on every step). Intersection short-circuits as
/// soon as the accumulator goes empty, since no later bitmap can add bits
/// back to an intersection.
pub struct BitmapFactory;

impl BitmapFactory {
    pub fn union_all<'a>(bitmaps: impl IntoIterator<Item = &'a ImmutableBitmap>) -> ImmutableBitmap {
        let mut acc = RoaringBitmap::new();
        for bm in bitmaps {
            acc |= &bm.0;
        }
        ImmutableBitmap(acc)
    }

    pub fn intersect_all<'a>(
        mut bitmaps: impl Iterator<Item = &'a ImmutableBitmap>,
    ) -> ImmutableBitmap {
        let Some(first) = bitmaps.next() else {
            return ImmutableBitmap::empty();
        };
        let mut acc = first.0.clone();
        for bm in bitmaps {
            if acc.is_empty() {
                break;
            }
            acc &= &bm.0;
        }
        ImmutableBitmap(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_intersect_associative() {
        let a = ImmutableBitmap::from_rows([1, 2, 3]);
        let b = ImmutableBitmap::from_rows([3, 4, 5]);
        let c = ImmutableBitmap::from_rows([5, 6, 7]);

        let left = a.union(&b).union(&c);
        let right = a.union(&b.union(&c));
        assert_eq!(left, right);

        let left = a.intersect(&b).intersect(&c);
        let right = a.intersect(&b.intersect(&c));
        assert_eq!(left, right);
    }

    #[test]
    fn complement_intersection_is_empty() {
        let a = ImmutableBitmap::from_rows([1, 2, 3]);
        let comp = a.complement(10);
        assert!(a.intersect(&comp).is_empty());
    }

    #[test]
    fn intersect_all_short_circuits_on_empty() {
        let a = ImmutableBitmap::from_rows([1, 2]);
        let b = ImmutableBitmap::empty();
        let c = ImmutableBitmap::from_rows([1]);
        let result = BitmapFactory::intersect_all([&a, &b, &c].into_iter());
        assert!(result.is_empty());
    }

    #[test]
    fn union_all_is_commutative_with_many() {
        let bitmaps = vec![
            ImmutableBitmap::from_rows([1]),
            ImmutableBitmap::from_rows([2]),
            ImmutableBitmap::from_rows([3]),
        ];
        let union = BitmapFactory::union_all(bitmaps.iter());
        assert_eq!(union.cardinality(), 3);
    }
}
