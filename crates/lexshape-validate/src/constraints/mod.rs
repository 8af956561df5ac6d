//! Constraint components and their evaluation.

pub mod cardinality;
pub mod logical;
pub mod pair;
pub mod value;

use crate::compile::{NestedShape, PatternConstraint};
use lexshape_rdf::vocab::sh;
use lexshape_rdf::{Graph, RdfTerm};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    MinCount(usize),
    MaxCount(usize),
    Datatype(String),
    NodeKind(String),
    Class(String),
    MinInclusive(RdfTerm),
    MaxInclusive(RdfTerm),
    MinExclusive(RdfTerm),
    MaxExclusive(RdfTerm),
    Pattern(PatternConstraint),
    MinLength(usize),
    MaxLength(usize),
    HasValue(RdfTerm),
    In(Vec<RdfTerm>),
    LanguageIn(Vec<String>),
    UniqueLang,
    /// Every value node conforms to the shape.
    Node(Arc<NestedShape>),
    /// No value node conforms to the shape.
    Not(Arc<NestedShape>),
    And(Vec<Arc<NestedShape>>),
    Or(Vec<Arc<NestedShape>>),
    Xone(Vec<Arc<NestedShape>>),
    QualifiedMinCount(QualifiedShape),
    QualifiedMaxCount(QualifiedShape),
    /// Predicates allowed on a value node of a closed shape.
    Closed(BTreeSet<String>),
    Equals(String),
    Disjoint(String),
    LessThan(String),
    LessThanOrEquals(String),
}

/// `sh:qualifiedValueShape` with one of its counts.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedShape {
    pub shape: Arc<NestedShape>,
    pub count: usize,
    /// `sh:qualifiedValueShapesDisjoint`
    pub disjoint: bool,
    /// Qualified shapes of sibling property shapes; only set when `disjoint`.
    pub siblings: Vec<Arc<NestedShape>>,
}

impl Constraint {
    /// IRI of the SHACL constraint component.
    pub fn component(&self) -> String {
        let local = match self {
            Self::MinCount(_) => "MinCountConstraintComponent",
            Self::MaxCount(_) => "MaxCountConstraintComponent",
            Self::Datatype(_) => "DatatypeConstraintComponent",
            Self::NodeKind(_) => "NodeKindConstraintComponent",
            Self::Class(_) => "ClassConstraintComponent",
            Self::MinInclusive(_) => "MinInclusiveConstraintComponent",
            Self::MaxInclusive(_) => "MaxInclusiveConstraintComponent",
            Self::MinExclusive(_) => "MinExclusiveConstraintComponent",
            Self::MaxExclusive(_) => "MaxExclusiveConstraintComponent",
            Self::Pattern(_) => "PatternConstraintComponent",
            Self::MinLength(_) => "MinLengthConstraintComponent",
            Self::MaxLength(_) => "MaxLengthConstraintComponent",
            Self::HasValue(_) => "HasValueConstraintComponent",
            Self::In(_) => "InConstraintComponent",
            Self::LanguageIn(_) => "LanguageInConstraintComponent",
            Self::UniqueLang => "UniqueLangConstraintComponent",
            Self::Node(_) => "NodeConstraintComponent",
            Self::Not(_) => "NotConstraintComponent",
            Self::And(_) => "AndConstraintComponent",
            Self::Or(_) => "OrConstraintComponent",
            Self::Xone(_) => "XoneConstraintComponent",
            Self::QualifiedMinCount(_) => "QualifiedMinCountConstraintComponent",
            Self::QualifiedMaxCount(_) => "QualifiedMaxCountConstraintComponent",
            Self::Closed(_) => "ClosedConstraintComponent",
            Self::Equals(_) => "EqualsConstraintComponent",
            Self::Disjoint(_) => "DisjointConstraintComponent",
            Self::LessThan(_) => "LessThanConstraintComponent",
            Self::LessThanOrEquals(_) => "LessThanOrEqualsConstraintComponent",
        };
        format!("{}{local}", sh::NS)
    }
}

/// One failed constraint check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    pub constraint: Constraint,
    pub value: Option<RdfTerm>,
    pub message: String,
}

/// Graphs a constraint may consult beyond the value nodes.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub data: &'a Graph,
    pub shapes: &'a Graph,
    pub rdfs_closure: bool,
}

/// Objects of `path` on `focus`. Literal focus nodes have none.
pub fn value_nodes(focus: &RdfTerm, path: &str, data: &Graph) -> Vec<RdfTerm> {
    match focus.as_node() {
        Some(node) => data.objects(node, path).cloned().collect(),
        None => Vec::new(),
    }
}

/// Evaluate one constraint against the value nodes of `focus`. For node-level
/// constraints the focus node is its own single value node.
pub fn evaluate(
    constraint: &Constraint,
    focus: &RdfTerm,
    values: &[RdfTerm],
    ctx: &EvalContext<'_>,
) -> Vec<ConstraintViolation> {
    let per_value = |check: &dyn Fn(&RdfTerm) -> Option<ConstraintViolation>| {
        values.iter().filter_map(check).collect::<Vec<_>>()
    };
    match constraint {
        Constraint::MinCount(min) => cardinality::validate_min_count(values, *min)
            .into_iter()
            .collect(),
        Constraint::MaxCount(max) => cardinality::validate_max_count(values, *max)
            .into_iter()
            .collect(),
        Constraint::Datatype(dt) => per_value(&|v| value::validate_datatype(constraint, dt, v)),
        Constraint::NodeKind(kind) => {
            per_value(&|v| value::validate_node_kind(constraint, kind, v))
        }
        Constraint::Class(class) => {
            per_value(&|v| value::validate_class(constraint, class, v, ctx))
        }
        Constraint::MinInclusive(_)
        | Constraint::MaxInclusive(_)
        | Constraint::MinExclusive(_)
        | Constraint::MaxExclusive(_) => per_value(&|v| value::validate_range(constraint, v)),
        Constraint::Pattern(pattern) => {
            per_value(&|v| value::validate_pattern(constraint, pattern, v))
        }
        Constraint::MinLength(_) | Constraint::MaxLength(_) => {
            per_value(&|v| value::validate_length(constraint, v))
        }
        Constraint::In(allowed) => per_value(&|v| value::validate_in(constraint, allowed, v)),
        Constraint::LanguageIn(langs) => {
            per_value(&|v| value::validate_language_in(constraint, langs, v))
        }
        Constraint::Node(shape) => per_value(&|v| logical::validate_node(constraint, shape, v, ctx)),
        Constraint::Not(shape) => per_value(&|v| logical::validate_not(constraint, shape, v, ctx)),
        Constraint::And(shapes) | Constraint::Or(shapes) | Constraint::Xone(shapes) => {
            per_value(&|v| logical::validate_combination(constraint, shapes, v, ctx))
        }
        Constraint::QualifiedMinCount(qualified) | Constraint::QualifiedMaxCount(qualified) => {
            logical::validate_qualified(constraint, qualified, values, ctx)
                .into_iter()
                .collect()
        }
        Constraint::Closed(allowed) => values
            .iter()
            .flat_map(|v| value::validate_closed(constraint, allowed, v, ctx))
            .collect(),
        Constraint::Equals(other)
        | Constraint::Disjoint(other)
        | Constraint::LessThan(other)
        | Constraint::LessThanOrEquals(other) => {
            pair::validate_pair(constraint, other, focus, values, ctx)
        }
        Constraint::HasValue(expected) => {
            if values.contains(expected) {
                Vec::new()
            } else {
                vec![ConstraintViolation {
                    constraint: constraint.clone(),
                    value: None,
                    message: format!("Missing required value {expected}"),
                }]
            }
        }
        Constraint::UniqueLang => {
            let mut seen = HashSet::new();
            let mut reported = HashSet::new();
            let mut out = Vec::new();
            for lang in values
                .iter()
                .filter_map(RdfTerm::as_literal)
                .filter_map(|l| l.language.as_deref())
            {
                let lang = lang.to_ascii_lowercase();
                if !seen.insert(lang.clone()) && reported.insert(lang.clone()) {
                    out.push(ConstraintViolation {
                        constraint: constraint.clone(),
                        value: None,
                        message: format!("Language tag '{lang}' is used more than once"),
                    });
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexshape_rdf::RdfLiteral;

    #[test]
    fn unique_lang_reports_each_duplicate_once() {
        let graph = Graph::new();
        let ctx = EvalContext {
            data: &graph,
            shapes: &graph,
            rdfs_closure: false,
        };
        let values: Vec<RdfTerm> = ["a", "b", "c"]
            .iter()
            .map(|v| RdfLiteral::lang(*v, "de").into())
            .collect();
        let out = evaluate(&Constraint::UniqueLang, &values[0], &values, &ctx);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn has_value_is_set_level() {
        let graph = Graph::new();
        let ctx = EvalContext {
            data: &graph,
            shapes: &graph,
            rdfs_closure: false,
        };
        let wanted = RdfTerm::iri("http://example.org/x");
        let values = vec![RdfTerm::iri("http://example.org/y"), wanted.clone()];
        assert!(evaluate(&Constraint::HasValue(wanted.clone()), &values[0], &values, &ctx).is_empty());
        assert_eq!(evaluate(&Constraint::HasValue(wanted.clone()), &wanted, &[], &ctx).len(), 1);
    }
}
