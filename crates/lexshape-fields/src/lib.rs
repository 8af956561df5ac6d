//! Field registry for lexshape.
//!
//! A [`DataField`] is a canonical, reusable property definition (name, path,
//! datatype, constraints). The [`FieldRegistry`] keeps them in insertion
//! order, persists them as one YAML mapping keyed by field name, and can
//! recover definitions from an existing SHACL document ([`ShaclImporter`]).

pub mod datatype;
pub mod field;
pub mod import;
pub mod registry;

pub use datatype::XsdDatatype;
pub use field::{constraint_keys, AnswerOption, ConstraintValue, DataField};
pub use import::{FieldExtraction, ImportFailure, ImportSummary, ShaclImporter};
pub use registry::FieldRegistry;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("failed to parse SHACL content: {0}")]
    Parse(#[from] lexshape_rdf::RdfError),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Datatype must start with 'xsd:' (got {0:?})")]
    InvalidDatatype(String),
    #[error("malformed field definition: {0}")]
    Malformed(String),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid registry document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
