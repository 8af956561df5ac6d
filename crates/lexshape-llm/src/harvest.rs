//! Field definitions implied by a generated shape.

use lexshape_fields::{DataField, FieldRegistry, XsdDatatype};
use lexshape_rdf::vocab::{self, rdfs, sh};
use lexshape_rdf::Graph;

/// Every property shape with an IRI `sh:path` and an XSD `sh:datatype` whose
/// path local name is not yet a registered field.
///
/// The field keeps the shape's own path (compacted with the graph's
/// prefixes) and takes its description from `sh:description`, `sh:name` or
/// `rdfs:comment`, else a placeholder.
pub fn harvest_fields(graph: &Graph, registry: &FieldRegistry) -> Vec<DataField> {
    let mut found: Vec<DataField> = Vec::new();
    for shape in graph.subjects() {
        let Some(path) = graph.object(&shape, sh::PATH).and_then(|t| t.as_iri()) else {
            continue;
        };
        let Some(datatype) = graph
            .object(&shape, sh::DATATYPE)
            .and_then(|t| t.as_iri())
            .and_then(XsdDatatype::from_iri)
        else {
            continue;
        };
        let name = vocab::local_name(path);
        if !is_field_name(name)
            || registry.contains(name)
            || found.iter().any(|f| f.name == name)
        {
            continue;
        }
        let description = [sh::DESCRIPTION, sh::NAME, rdfs::COMMENT]
            .iter()
            .find_map(|p| graph.literal(&shape, p))
            .map(|lit| lit.lexical.clone())
            .unwrap_or_else(|| format!("Field for {name}"));
        tracing::debug!(field = %name, datatype = %datatype, "harvested new data field");
        found.push(DataField::new(name, graph.compact(path), datatype, description));
    }
    found
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
