//! CNF normalization (spec §4.4 step 1): push `Not` down via de Morgan,
//! then distribute `Or` over `And`. Callers are assumed not to submit
//! pathological filters; this refuses (returns `None`) rather than
//! expanding past `MAX_CONJUNCTS`, since distribution is exponential in
//! the worst case.

use super::Filter;

const MAX_CONJUNCTS: usize = 4096;

/// Push `Not` to the leaves via de Morgan's laws. `with_not` on an
/// `Expression` leaf just flips its flag instead of wrapping in `Not`,
/// since the leaf already knows how to invert its own comparator.
fn push_not(filter: Filter, negate: bool) -> Filter {
    match filter {
        Filter::Not(inner) => push_not(*inner, !negate),
        Filter::And(children) => {
            let mapped = children.into_iter().map(|c| push_not(c, negate)).collect();
            if negate {
                Filter::Or(mapped)
            } else {
                Filter::And(mapped)
            }
        }
        Filter::Or(children) => {
            let mapped = children.into_iter().map(|c| push_not(c, negate)).collect();
            if negate {
                Filter::And(mapped)
            } else {
                Filter::Or(mapped)
            }
        }
        Filter::Expression { column, predicate, with_not } => Filter::Expression {
            column,
            predicate,
            with_not: if negate { !with_not } else { with_not },
        },
        Filter::Selector { dimension, value } => {
            if negate {
                Filter::NotIn { dimension, values: vec![value] }
            } else {
                Filter::Selector { dimension, value }
            }
        }
        Filter::In { dimension, values } => {
            if negate {
                Filter::NotIn { dimension, values }
            } else {
                Filter::In { dimension, values }
            }
        }
        Filter::NotIn { dimension, values } => {
            if negate {
                Filter::In { dimension, values }
            } else {
                Filter::NotIn { dimension, values }
            }
        }
        Filter::Bound { dimension, lower, lower_strict, upper, upper_strict } => {
            if negate {
                // complement of a bound is (< lower) OR (> upper)
                let mut parts = Vec::new();
                if let Some(l) = &lower {
                    parts.push(Filter::Bound {
                        dimension: dimension.clone(),
                        lower: None,
                        lower_strict: false,
                        upper: Some(l.clone()),
                        upper_strict: !lower_strict,
                    });
                }
                if let Some(u) = &upper {
                    parts.push(Filter::Bound {
                        dimension: dimension.clone(),
                        lower: Some(u.clone()),
                        lower_strict: !upper_strict,
                        upper: None,
                        upper_strict: false,
                    });
                }
                if parts.is_empty() {
                    Filter::AlwaysFalse
                } else {
                    Filter::Or(parts)
                }
            } else {
                Filter::Bound { dimension, lower, lower_strict, upper, upper_strict }
            }
        }
        Filter::AlwaysTrue => if negate { Filter::AlwaysFalse } else { Filter::AlwaysTrue },
        Filter::AlwaysFalse => if negate { Filter::AlwaysTrue } else { Filter::AlwaysFalse },
    }
}

fn distribute(filter: Filter, budget: &mut usize) -> Option<Filter> {
    match filter {
        Filter::Or(children) => {
            let mut distributed: Vec<Vec<Filter>> = vec![vec![]];
            for child in children {
                let child = distribute(child, budget)?;
                let child_conjuncts: Vec<Filter> = match child {
                    Filter::And(cs) => cs,
                    other => vec![other],
                };
                let mut next = Vec::new();
                for existing in &distributed {
                    for c in &child_conjuncts {
                        let mut combined = existing.clone();
                        combined.push(c.clone());
                        next.push(combined);
                        if next.len() > MAX_CONJUNCTS {
                            return None;
                        }
                    }
                }
                distributed = next;
            }
            *budget = budget.saturating_sub(distributed.len());
            if *budget == 0 {
                return None;
            }
            let clauses: Vec<Filter> = distributed.into_iter().map(Filter::or).collect();
            Some(Filter::and(clauses))
        }
        Filter::And(children) => {
            let mut out = Vec::with_capacity(children.len());
            for c in children {
                out.push(distribute(c, budget)?);
            }
            Some(Filter::and(out))
        }
        other => Some(other),
    }
}

/// Normalize `filter` to CNF, returning `None` if the bounded expansion
/// ceiling would be exceeded.
pub fn to_cnf(filter: Filter) -> Option<Filter> {
    let pushed = push_not(filter, false);
    let mut budget = MAX_CONJUNCTS;
    distribute(pushed, &mut budget)
}

/// Top-level conjuncts of a (possibly already-CNF) filter.
pub fn conjuncts(filter: &Filter) -> Vec<Filter> {
    match filter {
        Filter::And(children) => children.clone(),
        other => vec![other.clone()],
    }
}
