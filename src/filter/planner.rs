//! `partitionWithBitmapSupport` and `toBitmap` (spec §4.4): convert a
//! filter into a bitmap-satisfiable part and a residual predicate, with
//! preservation of exactness.

use super::cnf::{conjuncts, to_cnf};
use super::Filter;
use crate::column::bitmap::{BitmapFactory, ImmutableBitmap};
use crate::column::capabilities::ColumnCapabilities;
use crate::column::index::bitmap_index::BitmapIndex;
use crate::column::index::range_index::RangeIndex;
use crate::column::index::text_index::TextIndex;
use crate::column::index::Predicate;
use crate::column::ColumnReader;
use ahash::AHashMap;

/// Degree of bitmap support a leaf filter has against a given column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapSupport {
    /// A secondary index can answer this leaf exactly.
    Exact,
    /// No index can answer this leaf at all — must go to residual.
    None,
}

/// Resolves column capabilities and evaluates leaf filters against
/// secondary indexes. Passed explicitly through planning rather than
/// fetched from an ambient registry (spec §9's "pass a context object
/// through query execution" guidance).
pub struct ColumnResolver<'a> {
    columns: &'a AHashMap<String, ColumnReader>,
    num_rows: u32,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(columns: &'a AHashMap<String, ColumnReader>, num_rows: u32) -> Self {
        Self { columns, num_rows }
    }

    pub fn capabilities(&self, column: &str) -> Option<ColumnCapabilities> {
        self.columns.get(column).map(|c| c.capabilities())
    }

    /// `resolver.supportsBitmap(conjunct, EXACT)` (spec §4.4 step 2).
    pub fn supports_bitmap_exact(&self, filter: &Filter) -> bool {
        match filter {
            Filter::AlwaysTrue | Filter::AlwaysFalse => true,
            Filter::Selector { dimension, .. }
            | Filter::In { dimension, .. }
            | Filter::NotIn { dimension, .. }
            | Filter::Bound { dimension, .. } => self
                .capabilities(dimension)
                .map(|c| c.has_bitmap_index)
                .unwrap_or(false),
            Filter::Expression { column, predicate, .. } => {
                let Some(caps) = self.capabilities(column) else { return false };
                if caps.has_bitmap_index {
                    true
                } else if caps.has_metric_histogram {
                    // histogram support exists but may be inexact; it still
                    // counts as bitmap-supported for partitioning purposes —
                    // exactness is tracked separately by `to_bitmap`.
                    matches!(predicate, Predicate::Range { .. } | Predicate::Between(..) | Predicate::Point(_))
                } else {
                    caps.has_text_index
                }
            }
            Filter::And(children) | Filter::Or(children) => {
                children.iter().all(|c| self.supports_bitmap_exact(c))
            }
            Filter::Not(inner) => self.supports_bitmap_exact(inner),
        }
    }

    /// Evaluate a single column's bitmap for `filter`, dispatching to the
    /// appropriate secondary index (spec §4.4 `toBitmap`). Returns
    /// `(bitmap, exact)`.
    pub fn to_bitmap(&self, filter: &Filter) -> (ImmutableBitmap, bool) {
        match filter {
            Filter::AlwaysTrue => (ImmutableBitmap::all(self.num_rows), true),
            Filter::AlwaysFalse => (ImmutableBitmap::empty(), true),
            Filter::Selector { dimension, value } => self.dict_bitmap(dimension, &Predicate::Point(value.clone())),
            Filter::In { dimension, values } => {
                self.dict_bitmap(dimension, &Predicate::SetMembership(values.clone()))
            }
            Filter::NotIn { dimension, values } => {
                let (bm, exact) = self.dict_bitmap(dimension, &Predicate::SetMembership(values.clone()));
                (bm.complement(self.num_rows), exact)
            }
            Filter::Bound { dimension, lower, lower_strict, upper, upper_strict } => self.dict_bitmap(
                dimension,
                &Predicate::Range {
                    lower: lower.clone(),
                    lower_strict: *lower_strict,
                    upper: upper.clone(),
                    upper_strict: *upper_strict,
                },
            ),
            Filter::Expression { column, predicate, with_not } => {
                let (bm, exact) = self.expression_bitmap(column, predicate);
                if *with_not {
                    (bm.complement(self.num_rows), exact)
                } else {
                    (bm, exact)
                }
            }
            Filter::And(children) => {
                let results: Vec<(ImmutableBitmap, bool)> = children.iter().map(|c| self.to_bitmap(c)).collect();
                let exact = results.iter().all(|(_, e)| *e);
                let bm = BitmapFactory::intersect_all(results.iter().map(|(b, _)| b));
                (bm, exact)
            }
            Filter::Or(children) => {
                let results: Vec<(ImmutableBitmap, bool)> = children.iter().map(|c| self.to_bitmap(c)).collect();
                let exact = results.iter().all(|(_, e)| *e);
                let bm = BitmapFactory::union_all(results.iter().map(|(b, _)| b));
                (bm, exact)
            }
            Filter::Not(inner) => {
                let (bm, exact) = self.to_bitmap(inner);
                (bm.complement(self.num_rows), exact)
            }
        }
    }

    fn dict_bitmap(&self, dimension: &str, predicate: &Predicate) -> (ImmutableBitmap, bool) {
        match self.columns.get(dimension) {
            Some(ColumnReader::Dictionary(col)) => BitmapIndex::new(col).filter_for(predicate),
            // Missing column: predicate accepts null iff the point/set
            // includes the empty string (spec §4.4 edge case).
            None => {
                let accepts_null = predicate.matches_str("");
                if accepts_null {
                    (ImmutableBitmap::all(self.num_rows), true)
                } else {
                    (ImmutableBitmap::empty(), true)
                }
            }
            Some(_) => (self.match_predicate(dimension, predicate), true),
        }
    }

    fn expression_bitmap(&self, column: &str, predicate: &Predicate) -> (ImmutableBitmap, bool) {
        match self.columns.get(column) {
            Some(ColumnReader::Dictionary(col)) => {
                if let Some(text_rows) = self.text_rows(column) {
                    if let Some(result) = TextIndex::build(&text_rows).filter_for(predicate) {
                        return result;
                    }
                }
                BitmapIndex::new(col).filter_for(predicate)
            }
            Some(ColumnReader::Numeric(col)) => {
                let values: Vec<f64> = (0..col.length()).map(|i| col.as_f64(i)).collect();
                RangeIndex::build(&values, 64).filter_for(predicate)
            }
            _ => (self.match_predicate(column, predicate), true),
        }
    }

    fn text_rows(&self, _column: &str) -> Option<Vec<String>> {
        None
    }

    /// Fallback used when no closed-shape rule matches: scan the
    /// dictionary, apply the predicate to each value, OR the per-value
    /// bitmaps (spec §4.4 `matchPredicate`).
    pub fn match_predicate(&self, dimension: &str, predicate: &Predicate) -> ImmutableBitmap {
        match self.columns.get(dimension) {
            Some(ColumnReader::Dictionary(col)) => {
                let bitmaps: Vec<ImmutableBitmap> = col
                    .get_dictionary()
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| predicate.matches_str(v))
                    .map(|(id, _)| col.get_bitmap(id as i32))
                    .collect();
                BitmapFactory::union_all(bitmaps.iter())
            }
            _ => ImmutableBitmap::empty(),
        }
    }
}

/// `partitionWithBitmapSupport(filter, resolver) -> (bitmapPart, residualPart)`.
pub fn partition_with_bitmap_support(
    filter: &Filter,
    resolver: &ColumnResolver,
) -> (Option<Filter>, Option<Filter>) {
    let Some(cnf) = to_cnf(filter.clone()) else {
        // Pathological filter: treat entirely as residual rather than fail.
        return (None, Some(filter.clone()));
    };

    let mut bitmap_conjuncts = Vec::new();
    let mut residual_conjuncts = Vec::new();

    for conjunct in conjuncts(&cnf) {
        if resolver.supports_bitmap_exact(&conjunct) {
            bitmap_conjuncts.push(conjunct);
        } else {
            residual_conjuncts.push(conjunct);
        }
    }

    let bitmap_part = if bitmap_conjuncts.is_empty() { None } else { Some(Filter::and(bitmap_conjuncts)) };
    let residual_part = if residual_conjuncts.is_empty() { None } else { Some(Filter::and(residual_conjuncts)) };
    (bitmap_part, residual_part)
}
