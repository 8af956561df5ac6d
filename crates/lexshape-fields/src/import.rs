//! Recover field definitions from a SHACL document.
//!
//! Input vocabulary (benefit ontology, `ff:`):
//!
//! ```text
//! ff:einkommen a ff:DataField ;
//!     rdfs:label "Income"@en ;
//!     rdfs:comment "..." ;            # or schema:question
//!     ff:objectConstraints [          # sh:PropertyShape
//!         sh:datatype xsd:string ;
//!         sh:in ( ff:einkommen-ao-selbstaendig ... )
//!     ] ;
//!     ff:usageConstraints [           # sh:NodeShape
//!         sh:targetSubjectsOf ff:einkommen ;
//!         sh:property [ sh:path ff:einkommen ; sh:minCount 1 ]
//!     ] .
//!
//! ff:einkommen-ao-selbstaendig a ff:AnswerOption ; rdfs:label "Selbständig"@de .
//! ```
//!
//! Every `ff:DataField` subject becomes one [`DataField`]. A subject that
//! cannot be turned into a field is recorded in [`FieldExtraction::failures`]
//! and skipped; the others are still imported.

use crate::datatype::XsdDatatype;
use crate::field::{constraint_keys as keys, AnswerOption, ConstraintValue, DataField};
use crate::FieldError;
use lexshape_rdf::vocab::{self, ff, rdfs, schema, sh};
use lexshape_rdf::{Graph, ListEnd, RdfNode, RdfTerm};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub subject: String,
    pub reason: String,
}

/// Fields recovered from one graph.
#[derive(Debug, Clone, Default)]
pub struct FieldExtraction {
    pub fields: Vec<DataField>,
    pub failures: Vec<ImportFailure>,
}

/// Result of [`crate::FieldRegistry::import_from_shacl`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Distinct names registered, in document order.
    pub imported: Vec<String>,
    pub failures: Vec<ImportFailure>,
}

impl ImportSummary {
    /// Nothing was imported; the registry is unchanged.
    pub fn is_noop(&self) -> bool {
        self.imported.is_empty()
    }
}

/// Extra property-shape constraints copied verbatim (by lexical form).
const SCALAR_CONSTRAINTS: &[(&str, &str)] = &[
    (sh::PATTERN, keys::PATTERN),
    (sh::FLAGS, keys::FLAGS),
    (sh::MIN_INCLUSIVE, keys::MIN_INCLUSIVE),
    (sh::MAX_INCLUSIVE, keys::MAX_INCLUSIVE),
    (sh::MIN_EXCLUSIVE, keys::MIN_EXCLUSIVE),
    (sh::MAX_EXCLUSIVE, keys::MAX_EXCLUSIVE),
    (sh::MIN_LENGTH, keys::MIN_LENGTH),
    (sh::MAX_LENGTH, keys::MAX_LENGTH),
    (sh::UNIQUE_LANG, keys::UNIQUE_LANG),
    (sh::QUALIFIED_MIN_COUNT, keys::QUALIFIED_MIN_COUNT),
    (sh::QUALIFIED_MAX_COUNT, keys::QUALIFIED_MAX_COUNT),
];

#[derive(Debug, Clone)]
pub struct ShaclImporter {
    preferred_language: String,
}

impl Default for ShaclImporter {
    fn default() -> Self {
        Self::new("en")
    }
}

impl ShaclImporter {
    pub fn new(preferred_language: impl Into<String>) -> Self {
        Self {
            preferred_language: preferred_language.into(),
        }
    }

    pub fn extract(&self, graph: &Graph) -> FieldExtraction {
        let options = self.answer_options(graph);
        tracing::debug!(count = options.len(), "indexed answer options");

        let mut out = FieldExtraction::default();
        for subject in graph.subjects_of_type(ff::DATA_FIELD) {
            match self.extract_field(graph, &subject, &options) {
                Ok(field) => out.fields.push(field),
                Err(err) => {
                    tracing::warn!(subject = %subject, error = %err, "failed to import data field");
                    out.failures.push(ImportFailure {
                        subject: subject.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        out
    }

    /// `ff:AnswerOption` subjects keyed by node, with short id and label.
    fn answer_options(&self, graph: &Graph) -> HashMap<RdfNode, AnswerOption> {
        graph
            .subjects_of_type(ff::ANSWER_OPTION)
            .into_iter()
            .map(|node| {
                let id = short_id(&node);
                let label = self
                    .preferred_text(graph, &node, rdfs::LABEL)
                    .unwrap_or_else(|| id.clone());
                (node, AnswerOption { id, label })
            })
            .collect()
    }

    /// Literal in the preferred language, else the first literal.
    fn preferred_text(&self, graph: &Graph, subject: &RdfNode, predicate: &str) -> Option<String> {
        let mut first: Option<&str> = None;
        for lit in graph.literals(subject, predicate) {
            if lit.language.as_deref() == Some(self.preferred_language.as_str()) {
                return Some(lit.lexical.clone());
            }
            first.get_or_insert(lit.lexical.as_str());
        }
        first.map(str::to_string)
    }

    fn extract_field(
        &self,
        graph: &Graph,
        subject: &RdfNode,
        options: &HashMap<RdfNode, AnswerOption>,
    ) -> Result<DataField, FieldError> {
        let iri = subject
            .as_iri()
            .ok_or_else(|| FieldError::Malformed(format!("{subject} is not an IRI")))?;
        let name = vocab::fragment(iri);
        if name.is_empty() || name == iri {
            return Err(FieldError::Malformed(format!("{iri} has no fragment name")));
        }

        let label = self.preferred_text(graph, subject, rdfs::LABEL);
        let description = self
            .preferred_text(graph, subject, rdfs::COMMENT)
            .or_else(|| self.preferred_text(graph, subject, schema::QUESTION))
            .or(label)
            .unwrap_or_else(|| format!("Field for {name}"));

        let mut constraints: BTreeMap<String, ConstraintValue> = BTreeMap::new();

        if let Some(category) = graph.object(subject, schema::CATEGORY) {
            constraints.insert(
                keys::CATEGORY.into(),
                ConstraintValue::Text(vocab::fragment(&category.lexical()).to_string()),
            );
        }

        for linked in graph.objects(subject, ff::OBJECT_CONSTRAINTS) {
            let Some(shape) = constraint_shape(graph, linked, sh::PROPERTY_SHAPE) else {
                tracing::warn!(field = %name, node = %linked, "objectConstraints does not point at a shape");
                continue;
            };
            self.read_object_constraints(graph, &shape, options, &mut constraints)?;
        }

        for linked in graph.objects(subject, ff::USAGE_CONSTRAINTS) {
            let Some(shape) = constraint_shape(graph, linked, sh::NODE_SHAPE) else {
                tracing::warn!(field = %name, node = %linked, "usageConstraints does not point at a shape");
                continue;
            };
            read_usage_constraints(graph, &shape, iri, name, &mut constraints);
        }

        let datatype = match constraints.get(keys::DATATYPE).and_then(ConstraintValue::as_text) {
            Some(tag) => XsdDatatype::parse(tag)?,
            None => XsdDatatype::String,
        };

        let mut field = DataField::new(name, format!("ff:{name}"), datatype, description);
        if let Some(values) = constraints
            .get(keys::ALLOWED_VALUES)
            .and_then(ConstraintValue::as_options)
        {
            field.examples = values
                .iter()
                .map(|opt| format!("{} ({})", opt.label, opt.id))
                .collect();
        }
        field.constraints = constraints;

        tracing::debug!(field = %field.name, constraints = field.constraints.len(), "recovered data field");
        Ok(field)
    }

    fn read_object_constraints(
        &self,
        graph: &Graph,
        shape: &RdfNode,
        options: &HashMap<RdfNode, AnswerOption>,
        constraints: &mut BTreeMap<String, ConstraintValue>,
    ) -> Result<(), FieldError> {
        if let Some(target) = graph.object(shape, sh::TARGET_OBJECTS_OF) {
            constraints.insert(
                keys::TARGET_OBJECTS_OF.into(),
                ConstraintValue::Text(compact_term(graph, target)),
            );
        }

        if let Some(datatype) = graph.object(shape, sh::DATATYPE) {
            constraints.insert(
                keys::DATATYPE.into(),
                ConstraintValue::Text(normalize_datatype(datatype)?),
            );
        }

        let mut allowed: Vec<AnswerOption> = Vec::new();
        for value in graph.objects(shape, sh::IN) {
            let list = graph.list_or_value(value);
            if list.end != ListEnd::Nil {
                tracing::warn!(node = %value, end = ?list.end, items = list.items.len(), "sh:in list is malformed; keeping collected items");
            }
            allowed.extend(list.items.iter().map(|item| answer_option_for(item, options)));
        }
        if !allowed.is_empty() {
            constraints.insert(keys::ALLOWED_VALUES.into(), ConstraintValue::Options(allowed));
        }

        read_extra_constraints(graph, shape, constraints);
        Ok(())
    }
}

fn read_usage_constraints(
    graph: &Graph,
    shape: &RdfNode,
    field_iri: &str,
    field_name: &str,
    constraints: &mut BTreeMap<String, ConstraintValue>,
) {
    if let Some(target) = graph.object(shape, sh::TARGET_SUBJECTS_OF) {
        constraints.insert(
            keys::TARGET_SUBJECTS_OF.into(),
            ConstraintValue::Text(compact_term(graph, target)),
        );
    }

    for property in graph.objects(shape, sh::PROPERTY).filter_map(RdfTerm::as_node) {
        if let Some(min) = graph.object(property, sh::MIN_COUNT) {
            constraints.insert(keys::MIN_COUNT.into(), ConstraintValue::Text(min.lexical()));
        }
        if let Some(max) = graph.object(property, sh::MAX_COUNT) {
            constraints.insert(keys::MAX_COUNT.into(), ConstraintValue::Text(max.lexical()));
        }
        if let Some(path) = graph.object(property, sh::PATH) {
            if path.as_iri() != Some(field_iri) {
                tracing::warn!(field = %field_name, path = %path, "usage constraint path does not match field");
            }
        }
        read_extra_constraints(graph, property, constraints);
    }
}

fn read_extra_constraints(
    graph: &Graph,
    shape: &RdfNode,
    constraints: &mut BTreeMap<String, ConstraintValue>,
) {
    for (predicate, key) in SCALAR_CONSTRAINTS {
        if let Some(value) = graph.object(shape, predicate) {
            constraints.insert((*key).into(), ConstraintValue::Text(value.lexical()));
        }
    }

    if let Some(value) = graph.object(shape, sh::LANGUAGE_IN) {
        let langs: Vec<String> = graph
            .list_or_value(value)
            .items
            .iter()
            .map(RdfTerm::lexical)
            .collect();
        if !langs.is_empty() {
            constraints.insert(keys::LANGUAGE_IN.into(), ConstraintValue::List(langs));
        }
    }

    if let Some(value) = graph.object(shape, sh::QUALIFIED_VALUE_SHAPE) {
        constraints.insert(
            keys::QUALIFIED_VALUE_SHAPE.into(),
            ConstraintValue::Text(describe_shape(graph, value)),
        );
    }
}

/// The shape node a constraint link points at.
///
/// A node typed with `shape_class` is used as is; an untyped node is accepted
/// when it carries SHACL predicates.
fn constraint_shape(graph: &Graph, linked: &RdfTerm, shape_class: &str) -> Option<RdfNode> {
    let node = linked.as_node()?;
    if graph.has_type(node, shape_class)
        || graph
            .statements_about(node)
            .any(|t| t.predicate.starts_with(sh::NS))
    {
        Some(node.clone())
    } else {
        None
    }
}

fn answer_option_for(item: &RdfTerm, options: &HashMap<RdfNode, AnswerOption>) -> AnswerOption {
    if let Some(opt) = item.as_node().and_then(|n| options.get(n)) {
        return opt.clone();
    }
    let id = match item {
        RdfTerm::Node(node) => short_id(node),
        RdfTerm::Literal(lit) => lit.lexical.clone(),
    };
    AnswerOption {
        label: id.clone(),
        id,
    }
}

fn short_id(node: &RdfNode) -> String {
    match node {
        RdfNode::Iri(iri) => vocab::fragment(iri).to_string(),
        RdfNode::Blank(label) => label.clone(),
    }
}

/// `xsd:`-prefixed tag for a datatype IRI.
fn normalize_datatype(datatype: &RdfTerm) -> Result<String, FieldError> {
    let text = datatype.lexical();
    let tag = match text.rsplit_once('#') {
        Some((_, local)) => format!("xsd:{local}"),
        None => text,
    };
    XsdDatatype::parse(&tag).map(|dt| dt.tag())
}

fn compact_term(graph: &Graph, term: &RdfTerm) -> String {
    match term.as_iri() {
        Some(iri) => graph.compact(iri),
        None => term.lexical(),
    }
}

/// Stable summary of a value shape: its IRI, or its class/datatype/value.
fn describe_shape(graph: &Graph, value: &RdfTerm) -> String {
    let Some(node) = value.as_node() else {
        return value.lexical();
    };
    if let Some(iri) = node.as_iri() {
        return graph.compact(iri);
    }
    for (predicate, label) in [
        (sh::CLASS, "sh:class"),
        (sh::DATATYPE, "sh:datatype"),
        (sh::HAS_VALUE, "sh:hasValue"),
    ] {
        if let Some(v) = graph.object(node, predicate) {
            return format!("[ {label} {} ]", compact_term(graph, v));
        }
    }
    "[]".to_string()
}
