//! Persistent stores for lexshape.
//!
//! Every store is a long-lived service object owning its records behind one
//! `parking_lot::RwLock`, so a load-mutate-save sequence never interleaves
//! with another caller sharing the same `Arc`.
//!
//! | Store | Layout |
//! |---|---|
//! | [`ShapeStore`] | `shapes/<id>/{metadata.yaml, legal_text.txt, shape.ttl}` |
//! | [`ExampleStore`] | `examples/<name>/{legal_text.txt, shape.ttl, annotations.yaml}` |
//! | [`GeneratorContext`] | `generator_context.json` |
//! | [`InstanceStore`] | `instances/<id>/{properties.yaml, instance.ttl}` |

pub mod context;
pub mod examples;
mod fsutil;
pub mod id;
pub mod instances;
pub mod shapes;

pub use context::{FeedbackEntry, GeneratorContext};
pub use examples::{ExampleMapping, ExampleStore};
pub use id::text_id;
pub use instances::{instance_id, CitizenInstance, InstanceStore};
pub use shapes::{ShaclShape, ShapeStore};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Shape not found: {0}")]
    UnknownShape(String),
    #[error("Unknown instance: {0}")]
    UnknownInstance(String),
    #[error("No example at index {0}")]
    UnknownExample(usize),
    #[error("No feedback entry at index {0}")]
    UnknownFeedback(usize),
    #[error("No guideline at index {0}")]
    UnknownGuideline(usize),
    #[error("Invalid record identifier: {0:?}")]
    InvalidId(String),
    #[error("Invalid value for {field}: {message}")]
    Validation { field: String, message: String },
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid shape graph: {0}")]
    Rdf(#[from] lexshape_rdf::RdfError),
    #[error("validation failed: {0}")]
    Validator(#[from] lexshape_validate::ValidateError),
}
