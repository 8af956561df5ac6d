//! Shape-valued constraints: sh:node, sh:not, sh:and, sh:or, sh:xone and
//! qualified value shapes.

use super::value::violation;
use super::{evaluate, value_nodes, Constraint, ConstraintViolation, EvalContext, QualifiedShape};
use crate::compile::NestedShape;
use lexshape_rdf::RdfTerm;
use std::sync::Arc;

/// Whether `node` conforms to `shape`, i.e. checking it yields no result of
/// any severity.
pub fn conforms(node: &RdfTerm, shape: &NestedShape, ctx: &EvalContext<'_>) -> bool {
    let own = std::slice::from_ref(node);
    shape
        .node_constraints
        .iter()
        .all(|c| evaluate(c, node, own, ctx).is_empty())
        && shape.property_shapes.iter().all(|prop| {
            let values = value_nodes(node, &prop.path, ctx.data);
            prop.constraints
                .iter()
                .all(|c| evaluate(c, node, &values, ctx).is_empty())
        })
}

pub fn validate_node(
    constraint: &Constraint,
    shape: &NestedShape,
    value: &RdfTerm,
    ctx: &EvalContext<'_>,
) -> Option<ConstraintViolation> {
    (!conforms(value, shape, ctx)).then(|| {
        violation(
            constraint,
            value,
            format!("Value {value} does not conform to shape {}", shape.id),
        )
    })
}

pub fn validate_not(
    constraint: &Constraint,
    shape: &NestedShape,
    value: &RdfTerm,
    ctx: &EvalContext<'_>,
) -> Option<ConstraintViolation> {
    conforms(value, shape, ctx).then(|| {
        violation(
            constraint,
            value,
            format!("Value {value} conforms to shape {}, which is not allowed", shape.id),
        )
    })
}

/// sh:and, sh:or and sh:xone over one value node.
pub fn validate_combination(
    constraint: &Constraint,
    shapes: &[Arc<NestedShape>],
    value: &RdfTerm,
    ctx: &EvalContext<'_>,
) -> Option<ConstraintViolation> {
    let total = shapes.len();
    let conforming = shapes.iter().filter(|s| conforms(value, s, ctx)).count();
    let message = match constraint {
        Constraint::And(_) if conforming < total => {
            format!("Value {value} conforms to {conforming} of {total} required shapes")
        }
        Constraint::Or(_) if conforming == 0 => {
            format!("Value {value} does not conform to any of {total} alternative shapes")
        }
        Constraint::Xone(_) if conforming != 1 => {
            format!("Value {value} conforms to {conforming} of {total} shapes; exactly one is required")
        }
        _ => return None,
    };
    Some(violation(constraint, value, message))
}

/// Counts the value nodes that conform to the qualified shape and, when the
/// shapes are disjoint, to none of its siblings.
pub fn validate_qualified(
    constraint: &Constraint,
    qualified: &QualifiedShape,
    values: &[RdfTerm],
    ctx: &EvalContext<'_>,
) -> Option<ConstraintViolation> {
    let matching = values
        .iter()
        .filter(|v| {
            conforms(v, &qualified.shape, ctx)
                && !qualified.siblings.iter().any(|s| conforms(v, s, ctx))
        })
        .count();
    let bound = match constraint {
        Constraint::QualifiedMinCount(_) if matching < qualified.count => "at least",
        Constraint::QualifiedMaxCount(_) if matching > qualified.count => "at most",
        _ => return None,
    };
    Some(ConstraintViolation {
        constraint: constraint.clone(),
        value: None,
        message: format!(
            "Expected {bound} {} value(s) conforming to shape {} but found {matching}",
            qualified.count, qualified.shape.id
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexshape_rdf::{Graph, RdfLiteral, RdfNode};

    fn shape_requiring(path: &str) -> Arc<NestedShape> {
        Arc::new(NestedShape {
            id: RdfNode::blank(format!("needs_{path}")),
            property_shapes: vec![crate::compile::PropertyShape {
                id: RdfNode::blank(format!("p_{path}")),
                path: path.to_string(),
                constraints: vec![Constraint::MinCount(1)],
                severity: Default::default(),
                message: None,
            }],
            node_constraints: Vec::new(),
        })
    }

    #[test]
    fn combinations_count_conforming_members() {
        let mut data = Graph::new();
        let alice = RdfNode::iri("urn:alice");
        data.add(alice.clone(), "urn:income", RdfLiteral::plain("1"));
        let ctx = EvalContext {
            data: &data,
            shapes: &data,
            rdfs_closure: false,
        };
        let focus: RdfTerm = alice.into();
        let both = vec![shape_requiring("urn:income"), shape_requiring("urn:pension")];

        let or = Constraint::Or(both.clone());
        assert!(validate_combination(&or, &both, &focus, &ctx).is_none());
        let xone = Constraint::Xone(both.clone());
        assert!(validate_combination(&xone, &both, &focus, &ctx).is_none());
        let and = Constraint::And(both.clone());
        let failed = validate_combination(&and, &both, &focus, &ctx).expect("and fails");
        assert!(failed.message.contains("1 of 2"));
    }

    #[test]
    fn literal_values_have_no_properties() {
        let data = Graph::new();
        let ctx = EvalContext {
            data: &data,
            shapes: &data,
            rdfs_closure: false,
        };
        let shape = shape_requiring("urn:income");
        let literal = RdfTerm::Literal(RdfLiteral::plain("x"));
        assert!(!conforms(&literal, &shape, &ctx));
        let not = Constraint::Not(shape.clone());
        assert!(validate_not(&not, &shape, &literal, &ctx).is_none());
    }
}
