//! Per-value constraints: datatype, node kind, class, ranges, strings, lists.

use super::{Constraint, ConstraintViolation, EvalContext};
use crate::compile::{is_instance_of, PatternConstraint};
use lexshape_rdf::vocab::sh;
use lexshape_rdf::{is_valid_lexical, RdfLiteral, RdfNode, RdfTerm};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub(super) fn violation(
    constraint: &Constraint,
    value: &RdfTerm,
    message: String,
) -> ConstraintViolation {
    ConstraintViolation {
        constraint: constraint.clone(),
        value: Some(value.clone()),
        message,
    }
}

pub fn validate_datatype(
    constraint: &Constraint,
    datatype: &str,
    value: &RdfTerm,
) -> Option<ConstraintViolation> {
    let Some(lit) = value.as_literal() else {
        return Some(violation(
            constraint,
            value,
            format!("Expected a literal of datatype {datatype} but found {value}"),
        ));
    };
    if lit.datatype_iri() != datatype {
        return Some(violation(
            constraint,
            value,
            format!(
                "Expected datatype {} but found {}",
                datatype,
                lit.datatype_iri()
            ),
        ));
    }
    if !is_valid_lexical(datatype, &lit.lexical) {
        return Some(violation(
            constraint,
            value,
            format!("Value '{}' is not a valid {}", lit.lexical, datatype),
        ));
    }
    None
}

pub fn validate_node_kind(
    constraint: &Constraint,
    kind: &str,
    value: &RdfTerm,
) -> Option<ConstraintViolation> {
    let (is_iri, is_blank, is_literal) = match value {
        RdfTerm::Node(RdfNode::Iri(_)) => (true, false, false),
        RdfTerm::Node(RdfNode::Blank(_)) => (false, true, false),
        RdfTerm::Literal(_) => (false, false, true),
    };
    let ok = match kind {
        sh::IRI => is_iri,
        sh::BLANK_NODE => is_blank,
        sh::LITERAL => is_literal,
        sh::BLANK_NODE_OR_IRI => is_blank || is_iri,
        sh::BLANK_NODE_OR_LITERAL => is_blank || is_literal,
        sh::IRI_OR_LITERAL => is_iri || is_literal,
        _ => true,
    };
    (!ok).then(|| {
        violation(
            constraint,
            value,
            format!("Expected node kind {kind} but found {value}"),
        )
    })
}

pub fn validate_class(
    constraint: &Constraint,
    class: &str,
    value: &RdfTerm,
    ctx: &EvalContext<'_>,
) -> Option<ConstraintViolation> {
    let ok = value
        .as_node()
        .is_some_and(|node| is_instance_of(ctx.data, ctx.shapes, node, class, ctx.rdfs_closure));
    (!ok).then(|| {
        violation(
            constraint,
            value,
            format!("Value {value} is not an instance of <{class}>"),
        )
    })
}

/// Numeric comparison when both sides parse as numbers, otherwise lexical
/// comparison between literals of the same datatype.
pub(super) fn compare(value: &RdfLiteral, bound: &RdfLiteral) -> Option<Ordering> {
    if let (Ok(a), Ok(b)) = (
        value.lexical.trim().parse::<f64>(),
        bound.lexical.trim().parse::<f64>(),
    ) {
        return a.partial_cmp(&b);
    }
    (value.datatype_iri() == bound.datatype_iri()).then(|| value.lexical.cmp(&bound.lexical))
}

pub fn validate_range(
    constraint: &Constraint,
    value: &RdfTerm,
) -> Option<ConstraintViolation> {
    let (bound, relation) = match constraint {
        Constraint::MinInclusive(b) => (b, "greater than or equal to"),
        Constraint::MaxInclusive(b) => (b, "less than or equal to"),
        Constraint::MinExclusive(b) => (b, "greater than"),
        Constraint::MaxExclusive(b) => (b, "less than"),
        _ => return None,
    };
    let ordering = match (value.as_literal(), bound.as_literal()) {
        (Some(v), Some(b)) => compare(v, b),
        _ => None,
    };
    let accepted = |o: Ordering| match constraint {
        Constraint::MinInclusive(_) => o != Ordering::Less,
        Constraint::MaxInclusive(_) => o != Ordering::Greater,
        Constraint::MinExclusive(_) => o == Ordering::Greater,
        _ => o == Ordering::Less,
    };
    match ordering {
        Some(o) if accepted(o) => None,
        Some(_) => Some(violation(
            constraint,
            value,
            format!("Value {} must be {} {}", value, relation, bound.lexical()),
        )),
        None => Some(violation(
            constraint,
            value,
            format!("Value {} cannot be compared with {}", value, bound.lexical()),
        )),
    }
}

pub fn validate_pattern(
    constraint: &Constraint,
    pattern: &PatternConstraint,
    value: &RdfTerm,
) -> Option<ConstraintViolation> {
    let text = match value {
        RdfTerm::Node(RdfNode::Blank(_)) => None,
        other => Some(other.lexical()),
    };
    match text {
        Some(text) if pattern.regex.is_match(&text) => None,
        Some(text) => Some(violation(
            constraint,
            value,
            format!(
                "Value '{}' does not match pattern '{}'",
                text, pattern.pattern
            ),
        )),
        None => Some(violation(
            constraint,
            value,
            format!("Blank node {value} cannot match pattern '{}'", pattern.pattern),
        )),
    }
}

pub fn validate_length(constraint: &Constraint, value: &RdfTerm) -> Option<ConstraintViolation> {
    if matches!(value, RdfTerm::Node(RdfNode::Blank(_))) {
        return Some(violation(
            constraint,
            value,
            format!("Blank node {value} has no string length"),
        ));
    }
    let len = value.lexical().chars().count();
    match constraint {
        Constraint::MinLength(min) if len < *min => Some(violation(
            constraint,
            value,
            format!("String length {len} is less than minimum {min}"),
        )),
        Constraint::MaxLength(max) if len > *max => Some(violation(
            constraint,
            value,
            format!("String length {len} exceeds maximum {max}"),
        )),
        _ => None,
    }
}

pub fn validate_in(
    constraint: &Constraint,
    allowed: &[RdfTerm],
    value: &RdfTerm,
) -> Option<ConstraintViolation> {
    (!allowed.contains(value)).then(|| {
        let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
        violation(
            constraint,
            value,
            format!("Value {} is not in [{}]", value, listed.join(", ")),
        )
    })
}

/// One result per predicate of `value` that a closed shape does not declare.
pub fn validate_closed(
    constraint: &Constraint,
    allowed: &BTreeSet<String>,
    value: &RdfTerm,
    ctx: &EvalContext<'_>,
) -> Vec<ConstraintViolation> {
    let Some(node) = value.as_node() else {
        return Vec::new();
    };
    ctx.data
        .statements_about(node)
        .filter(|t| !allowed.contains(&t.predicate))
        .map(|t| ConstraintViolation {
            constraint: constraint.clone(),
            value: Some(t.object.clone()),
            message: format!("Property <{}> is not allowed by the closed shape", t.predicate),
        })
        .collect()
}

/// Basic `langMatches` filtering.
fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    tag == range
        || tag
            .strip_prefix(range.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
}

pub fn validate_language_in(
    constraint: &Constraint,
    languages: &[String],
    value: &RdfTerm,
) -> Option<ConstraintViolation> {
    let tag = value.as_literal().and_then(|l| l.language.as_deref());
    let ok = tag.is_some_and(|tag| languages.iter().any(|range| lang_matches(tag, range)));
    (!ok).then(|| {
        violation(
            constraint,
            value,
            format!(
                "Language of {} is not one of [{}]",
                value,
                languages.join(", ")
            ),
        )
    })
}
