//! Property pair constraints: sh:equals, sh:disjoint, sh:lessThan and
//! sh:lessThanOrEquals.

use super::value::{compare, violation};
use super::{value_nodes, Constraint, ConstraintViolation, EvalContext};
use lexshape_rdf::RdfTerm;
use std::cmp::Ordering;

/// Compare the value nodes against the values of `other` on the same focus node.
pub fn validate_pair(
    constraint: &Constraint,
    other: &str,
    focus: &RdfTerm,
    values: &[RdfTerm],
    ctx: &EvalContext<'_>,
) -> Vec<ConstraintViolation> {
    let others = value_nodes(focus, other, ctx.data);
    let mut out = Vec::new();
    match constraint {
        Constraint::Equals(_) => {
            for v in values.iter().filter(|v| !others.contains(v)) {
                out.push(violation(
                    constraint,
                    v,
                    format!("Value {v} is not also a value of <{other}>"),
                ));
            }
            for o in others.iter().filter(|o| !values.contains(o)) {
                out.push(violation(
                    constraint,
                    o,
                    format!("Value {o} of <{other}> is missing"),
                ));
            }
        }
        Constraint::Disjoint(_) => {
            for v in values.iter().filter(|v| others.contains(v)) {
                out.push(violation(
                    constraint,
                    v,
                    format!("Value {v} is also a value of <{other}>"),
                ));
            }
        }
        Constraint::LessThan(_) | Constraint::LessThanOrEquals(_) => {
            let strict = matches!(constraint, Constraint::LessThan(_));
            let relation = if strict {
                "less than"
            } else {
                "less than or equal to"
            };
            for v in values {
                for o in &others {
                    let ordering = match (v.as_literal(), o.as_literal()) {
                        (Some(a), Some(b)) => compare(a, b),
                        _ => None,
                    };
                    let ok = match ordering {
                        Some(Ordering::Less) => true,
                        Some(Ordering::Equal) => !strict,
                        _ => false,
                    };
                    if !ok {
                        out.push(violation(
                            constraint,
                            v,
                            format!("Value {v} is not {relation} {o} of <{other}>"),
                        ));
                    }
                }
            }
        }
        _ => {}
    }
    out
}
