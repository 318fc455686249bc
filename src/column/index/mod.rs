//! Secondary indexes that attach to columns (spec §4.1):
//! `{bitmap-index, lucene-text-index, metric-histogram}`.
//!
//! Each exposes `filterFor(predicate) -> ImmutableBitmap` against a closed
//! set of predicate shapes — never an arbitrary lambda — so that an index
//! implementation can answer without materializing rows.

pub mod bitmap_index;
pub mod range_index;
pub mod text_index;

use serde::{Deserialize, Serialize};

/// The closed set of predicate shapes secondary indexes know how to
/// translate (spec §4.1). Anything outside this set routes to the generic
/// residual matcher (`matchPredicate`, spec §4.4) instead of an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Predicate {
    Point(String),
    /// Open/closed range, either bound optional. `lower_strict`/`upper_strict`
    /// mirror spec §4.4's "open/closed ends derived from strict flags".
    Range {
        lower: Option<String>,
        lower_strict: bool,
        upper: Option<String>,
        upper_strict: bool,
    },
    SetMembership(Vec<String>),
    Between(String, String),
}

impl Predicate {
    pub fn matches_str(&self, value: &str) -> bool {
        match self {
            Predicate::Point(p) => value == p,
            Predicate::SetMembership(set) => set.iter().any(|s| s == value),
            Predicate::Between(lo, hi) => value >= lo.as_str() && value <= hi.as_str(),
            Predicate::Range { lower, lower_strict, upper, upper_strict } => {
                let lower_ok = match lower {
                    None => true,
                    Some(l) => {
                        if *lower_strict {
                            value > l.as_str()
                        } else {
                            value >= l.as_str()
                        }
                    }
                };
                let upper_ok = match upper {
                    None => true,
                    Some(u) => {
                        if *upper_strict {
                            value < u.as_str()
                        } else {
                            value <= u.as_str()
                        }
                    }
                };
                lower_ok && upper_ok
            }
        }
    }

    pub fn matches_num(&self, value: f64) -> bool {
        let parse = |s: &str| s.parse::<f64>().unwrap_or(f64::NAN);
        match self {
            Predicate::Point(p) => value == parse(p),
            Predicate::SetMembership(set) => set.iter().any(|s| value == parse(s)),
            Predicate::Between(lo, hi) => value >= parse(lo) && value <= parse(hi),
            Predicate::Range { lower, lower_strict, upper, upper_strict } => {
                let lower_ok = match lower {
                    None => true,
                    Some(l) => {
                        if *lower_strict { value > parse(l) } else { value >= parse(l) }
                    }
                };
                let upper_ok = match upper {
                    None => true,
                    Some(u) => {
                        if *upper_strict { value < parse(u) } else { value <= parse(u) }
                    }
                };
                lower_ok && upper_ok
            }
        }
    }
}
