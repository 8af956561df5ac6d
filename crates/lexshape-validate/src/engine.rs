//! Built-in SHACL validation engine.

use crate::compile::{is_instance_of, CompiledShape, PropertyShape, ShapeCompiler, TargetType};
use crate::constraints::{evaluate, value_nodes, ConstraintViolation, EvalContext};
use crate::report::{ValidationReport, ValidationResult};
use crate::{InferenceMode, ShaclValidator, ValidateError, ValidationOutcome};
use lexshape_rdf::{Graph, RdfNode, RdfTerm};
use std::collections::HashSet;

/// Validates data graphs against shapes compiled on every call.
///
/// With [`InferenceMode::Rdfs`] a shape targeting `Animal` also applies to
/// instances of `Dog` when `Dog rdfs:subClassOf Animal` is asserted in
/// either graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShaclEngine;

impl ShaclEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate every focus node targeted by `shapes`.
    pub fn validate_report(
        &self,
        data: &Graph,
        shapes: &Graph,
        inference: InferenceMode,
    ) -> Result<ValidationReport, ValidateError> {
        let compiled = ShapeCompiler::new().compile(shapes)?;
        if compiled.is_empty() {
            tracing::debug!("no targeted shapes; data conforms trivially");
            return Ok(ValidationReport::conforming());
        }
        let ctx = EvalContext {
            data,
            shapes,
            rdfs_closure: inference == InferenceMode::Rdfs,
        };

        let mut results = Vec::new();
        for shape in &compiled {
            let focus_nodes = focus_nodes(shape, &ctx);
            tracing::trace!(shape = %shape.id, focus = focus_nodes.len(), "validating shape");
            for focus in &focus_nodes {
                results.extend(validate_shape(focus, shape, &ctx));
            }
        }
        let report = ValidationReport::from_results(results);
        tracing::debug!(
            conforms = report.conforms,
            violations = report.violation_count(),
            warnings = report.warning_count(),
            "validation finished"
        );
        Ok(report)
    }
}

impl ShaclValidator for ShaclEngine {
    fn validate(
        &self,
        data: &Graph,
        shapes: &Graph,
        inference: InferenceMode,
    ) -> Result<ValidationOutcome, ValidateError> {
        let report = self.validate_report(data, shapes, inference)?;
        Ok(ValidationOutcome {
            conforms: report.conforms,
            report: report.to_graph(),
            text: report.to_text(),
        })
    }
}

fn focus_nodes(shape: &CompiledShape, ctx: &EvalContext<'_>) -> Vec<RdfTerm> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |term: RdfTerm| {
        if seen.insert(term.clone()) {
            out.push(term);
        }
    };
    for target in &shape.targets {
        match target {
            TargetType::Class(class) | TargetType::ImplicitClass(class) => {
                for subject in ctx.data.subjects() {
                    if is_instance_of(ctx.data, ctx.shapes, &subject, class, ctx.rdfs_closure) {
                        push(subject.into());
                    }
                }
            }
            TargetType::Node(term) => push(term.clone()),
            TargetType::SubjectsOf(predicate) => {
                for t in ctx.data.triples().filter(|t| &t.predicate == predicate) {
                    push(t.subject.clone().into());
                }
            }
            TargetType::ObjectsOf(predicate) => {
                for object in ctx.data.objects_of_predicate(predicate) {
                    push(object);
                }
            }
        }
    }
    out
}

fn validate_shape(
    focus: &RdfTerm,
    shape: &CompiledShape,
    ctx: &EvalContext<'_>,
) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    let own_value = std::slice::from_ref(focus);
    for constraint in &shape.node_constraints {
        for violation in evaluate(constraint, focus, own_value, ctx) {
            results.push(to_result(
                focus,
                None,
                &shape.id,
                shape.severity,
                shape.message.as_deref(),
                violation,
            ));
        }
    }

    for prop in &shape.property_shapes {
        results.extend(validate_property(focus, prop, ctx));
    }
    results
}

fn validate_property(
    focus: &RdfTerm,
    prop: &PropertyShape,
    ctx: &EvalContext<'_>,
) -> Vec<ValidationResult> {
    let values = value_nodes(focus, &prop.path, ctx.data);
    prop.constraints
        .iter()
        .flat_map(|constraint| evaluate(constraint, focus, &values, ctx))
        .map(|violation| {
            to_result(
                focus,
                Some(&prop.path),
                &prop.id,
                prop.severity,
                prop.message.as_deref(),
                violation,
            )
        })
        .collect()
}

fn to_result(
    focus: &RdfTerm,
    path: Option<&str>,
    shape: &RdfNode,
    severity: crate::Severity,
    message_override: Option<&str>,
    violation: ConstraintViolation,
) -> ValidationResult {
    ValidationResult {
        focus_node: focus.clone(),
        result_path: path.map(str::to_string),
        source_shape: shape.clone(),
        source_constraint: violation.constraint.component(),
        severity,
        message: message_override
            .map(str::to_string)
            .unwrap_or(violation.message),
        value: violation.value,
    }
}
