//! Filter & bitmap planner (C4, spec §4.4): pure functions over a filter
//! AST and a column-capability lookup. Modeled as a closed tagged variant
//! (spec §9) rather than a filter class hierarchy — each variant carries
//! exactly the fields its `toBitmap` dispatch needs.

pub mod cnf;
pub mod planner;

use crate::column::index::Predicate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    Selector { dimension: String, value: String },
    In { dimension: String, values: Vec<String> },
    NotIn { dimension: String, values: Vec<String> },
    Bound {
        dimension: String,
        lower: Option<String>,
        lower_strict: bool,
        upper: Option<String>,
        upper_strict: bool,
    },
    /// A generic predicate tree over one column, expressed via the closed
    /// set of predicate shapes (spec §4.1/§4.4).
    Expression { column: String, predicate: Predicate, with_not: bool },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// Matches every row. Used by rewrites and by `always-true` results
    /// from the CNF partitioner.
    AlwaysTrue,
    /// Matches no rows.
    AlwaysFalse,
}

impl Filter {
    pub fn and(filters: Vec<Filter>) -> Filter {
        let mut flat = Vec::new();
        for f in filters {
            match f {
                Filter::And(inner) => flat.extend(inner),
                Filter::AlwaysTrue => {}
                other => flat.push(other),
            }
        }
        if flat.is_empty() {
            Filter::AlwaysTrue
        } else if flat.len() == 1 {
            flat.into_iter().next().unwrap()
        } else {
            Filter::And(flat)
        }
    }

    pub fn or(filters: Vec<Filter>) -> Filter {
        let mut flat = Vec::new();
        for f in filters {
            match f {
                Filter::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.into_iter().next().unwrap()
        } else {
            Filter::Or(flat)
        }
    }

    /// Row-wise evaluation used as the residual matcher and as the ground
    /// truth in property tests (spec §8: "rows accepted by evaluating F
    /// row-wise equal rows accepted by bitmap(F) ∪ residual(F)").
    pub fn matches_row(&self, row: &dyn Fn(&str) -> Option<String>) -> bool {
        match self {
            Filter::Selector { dimension, value } => row(dimension).unwrap_or_default() == *value,
            Filter::In { dimension, values } => {
                let v = row(dimension).unwrap_or_default();
                values.contains(&v)
            }
            Filter::NotIn { dimension, values } => {
                let v = row(dimension).unwrap_or_default();
                !values.contains(&v)
            }
            Filter::Bound { dimension, lower, lower_strict, upper, upper_strict } => {
                let v = row(dimension).unwrap_or_default();
                let lower_ok = match lower {
                    None => true,
                    Some(l) => if *lower_strict { v.as_str() > l.as_str() } else { v.as_str() >= l.as_str() },
                };
                let upper_ok = match upper {
                    None => true,
                    Some(u) => if *upper_strict { v.as_str() < u.as_str() } else { v.as_str() <= u.as_str() },
                };
                lower_ok && upper_ok
            }
            Filter::Expression { column, predicate, with_not } => {
                let v = row(column).unwrap_or_default();
                let m = predicate.matches_str(&v);
                if *with_not { !m } else { m }
            }
            Filter::And(children) => children.iter().all(|c| c.matches_row(row)),
            Filter::Or(children) => children.iter().any(|c| c.matches_row(row)),
            Filter::Not(inner) => !inner.matches_row(row),
            Filter::AlwaysTrue => true,
            Filter::AlwaysFalse => false,
        }
    }
}
