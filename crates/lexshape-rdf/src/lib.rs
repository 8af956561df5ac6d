//! RDF layer for lexshape.
//!
//! A small owned term model ([`RdfNode`], [`RdfLiteral`], [`RdfTerm`]) and an
//! indexed [`Graph`] over it. Turtle input is parsed with **Sophia** and
//! converted into the owned model, so blank nodes are addressable directly by
//! their label for the lifetime of a graph.
//!
//! - [`turtle::parse_turtle`] / [`turtle::write_turtle`]: serialization boundary.
//! - [`list::decode_linked_list`]: generic head/rest list decoding with a cycle
//!   and length guard; [`Graph::rdf_list`] applies it to `rdf:first`/`rdf:rest`.
//! - [`lexical::is_valid_lexical`]: XSD lexical-space checks shared by field
//!   registration, instance creation and validation.
//! - [`vocab`]: namespace constants and CURIE helpers.

pub mod graph;
pub mod lexical;
pub mod list;
pub mod model;
pub mod turtle;
pub mod vocab;

pub use graph::Graph;
pub use lexical::is_valid_lexical;
pub use list::{decode_linked_list, DecodedList, ListEnd, DEFAULT_MAX_LIST_LEN};
pub use model::{RdfLiteral, RdfNode, RdfTerm, Triple};
pub use turtle::{declared_prefixes, parse_turtle, write_turtle};

#[derive(Debug, thiserror::Error)]
pub enum RdfError {
    #[error("invalid Turtle: {0}")]
    Parse(String),
    #[error("unsupported RDF term form: {0}")]
    Term(String),
}
