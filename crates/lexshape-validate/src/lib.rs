//! SHACL validation for lexshape.
//!
//! Validation is consumed through the [`ShaclValidator`] trait:
//! `validate(data, shapes, inference) -> (conforms, report graph, report text)`.
//! [`ShaclEngine`] is the built-in implementation. It covers the structural
//! subset lexshape generates and imports:
//!
//! - targets: `sh:targetClass`, `sh:targetNode`, `sh:targetSubjectsOf`,
//!   `sh:targetObjectsOf`, implicit class targets
//! - property shapes with a simple predicate `sh:path`
//! - cardinality, datatype, node kind, class, `sh:in`, `sh:hasValue`,
//!   pattern, length, range and language constraints
//! - shape-valued constraints (`sh:node`, `sh:not`, `sh:and`, `sh:or`,
//!   `sh:xone`, qualified value shapes), `sh:closed` and property pairs
//!
//! Shapes using any other `sh:` parameter fail to compile with
//! [`ValidateError::UnsupportedParameter`].
//!
//! [`messages_from_report`] turns any SHACL report graph into the ordered list
//! of `sh:resultMessage` texts.

pub mod compile;
pub mod constraints;
pub mod engine;
pub mod report;

pub use compile::{
    CompiledShape, NestedShape, PropertyShape, Severity, ShapeCompiler, TargetType,
};
pub use constraints::{Constraint, ConstraintViolation, QualifiedShape};
pub use engine::ShaclEngine;
pub use report::{messages_from_report, ValidationReport, ValidationResult};

use lexshape_rdf::Graph;

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("Invalid regex pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("Invalid constraint on shape {shape}: {message}")]
    InvalidConstraint { shape: String, message: String },
    #[error("Unsupported SHACL parameter <{parameter}> on shape {shape}")]
    UnsupportedParameter { shape: String, parameter: String },
}

/// Entailment applied before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceMode {
    /// Only asserted `rdf:type` triples count.
    #[default]
    None,
    /// `rdfs:subClassOf` closure is applied to class targets and `sh:class`.
    Rdfs,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub conforms: bool,
    pub report: Graph,
    pub text: String,
}

/// External SHACL validation boundary.
pub trait ShaclValidator: Send + Sync {
    fn validate(
        &self,
        data: &Graph,
        shapes: &Graph,
        inference: InferenceMode,
    ) -> Result<ValidationOutcome, ValidateError>;
}
