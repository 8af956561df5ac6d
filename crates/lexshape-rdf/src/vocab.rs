//! Namespace vocabulary and CURIE helpers.

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
    pub const CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
}

pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
}

pub mod sh {
    pub const NS: &str = "http://www.w3.org/ns/shacl#";
    pub const NODE_SHAPE: &str = "http://www.w3.org/ns/shacl#NodeShape";
    pub const PROPERTY_SHAPE: &str = "http://www.w3.org/ns/shacl#PropertyShape";
    pub const PROPERTY: &str = "http://www.w3.org/ns/shacl#property";
    pub const PATH: &str = "http://www.w3.org/ns/shacl#path";
    pub const NAME: &str = "http://www.w3.org/ns/shacl#name";
    pub const DESCRIPTION: &str = "http://www.w3.org/ns/shacl#description";
    pub const MESSAGE: &str = "http://www.w3.org/ns/shacl#message";
    pub const SEVERITY: &str = "http://www.w3.org/ns/shacl#severity";
    pub const DEACTIVATED: &str = "http://www.w3.org/ns/shacl#deactivated";

    pub const TARGET_CLASS: &str = "http://www.w3.org/ns/shacl#targetClass";
    pub const TARGET_NODE: &str = "http://www.w3.org/ns/shacl#targetNode";
    pub const TARGET_SUBJECTS_OF: &str = "http://www.w3.org/ns/shacl#targetSubjectsOf";
    pub const TARGET_OBJECTS_OF: &str = "http://www.w3.org/ns/shacl#targetObjectsOf";

    pub const MIN_COUNT: &str = "http://www.w3.org/ns/shacl#minCount";
    pub const MAX_COUNT: &str = "http://www.w3.org/ns/shacl#maxCount";
    pub const DATATYPE: &str = "http://www.w3.org/ns/shacl#datatype";
    pub const IN: &str = "http://www.w3.org/ns/shacl#in";
    pub const HAS_VALUE: &str = "http://www.w3.org/ns/shacl#hasValue";
    pub const PATTERN: &str = "http://www.w3.org/ns/shacl#pattern";
    pub const FLAGS: &str = "http://www.w3.org/ns/shacl#flags";
    pub const MIN_LENGTH: &str = "http://www.w3.org/ns/shacl#minLength";
    pub const MAX_LENGTH: &str = "http://www.w3.org/ns/shacl#maxLength";
    pub const MIN_INCLUSIVE: &str = "http://www.w3.org/ns/shacl#minInclusive";
    pub const MAX_INCLUSIVE: &str = "http://www.w3.org/ns/shacl#maxInclusive";
    pub const MIN_EXCLUSIVE: &str = "http://www.w3.org/ns/shacl#minExclusive";
    pub const MAX_EXCLUSIVE: &str = "http://www.w3.org/ns/shacl#maxExclusive";
    pub const CLASS: &str = "http://www.w3.org/ns/shacl#class";
    pub const NODE_KIND: &str = "http://www.w3.org/ns/shacl#nodeKind";
    pub const LANGUAGE_IN: &str = "http://www.w3.org/ns/shacl#languageIn";
    pub const UNIQUE_LANG: &str = "http://www.w3.org/ns/shacl#uniqueLang";
    pub const QUALIFIED_VALUE_SHAPE: &str = "http://www.w3.org/ns/shacl#qualifiedValueShape";
    pub const QUALIFIED_MIN_COUNT: &str = "http://www.w3.org/ns/shacl#qualifiedMinCount";
    pub const QUALIFIED_MAX_COUNT: &str = "http://www.w3.org/ns/shacl#qualifiedMaxCount";
    pub const QUALIFIED_VALUE_SHAPES_DISJOINT: &str =
        "http://www.w3.org/ns/shacl#qualifiedValueShapesDisjoint";
    pub const NODE: &str = "http://www.w3.org/ns/shacl#node";
    pub const NOT: &str = "http://www.w3.org/ns/shacl#not";
    pub const AND: &str = "http://www.w3.org/ns/shacl#and";
    pub const OR: &str = "http://www.w3.org/ns/shacl#or";
    pub const XONE: &str = "http://www.w3.org/ns/shacl#xone";
    pub const CLOSED: &str = "http://www.w3.org/ns/shacl#closed";
    pub const IGNORED_PROPERTIES: &str = "http://www.w3.org/ns/shacl#ignoredProperties";
    pub const EQUALS: &str = "http://www.w3.org/ns/shacl#equals";
    pub const DISJOINT: &str = "http://www.w3.org/ns/shacl#disjoint";
    pub const LESS_THAN: &str = "http://www.w3.org/ns/shacl#lessThan";
    pub const LESS_THAN_OR_EQUALS: &str = "http://www.w3.org/ns/shacl#lessThanOrEquals";
    pub const ORDER: &str = "http://www.w3.org/ns/shacl#order";
    pub const GROUP: &str = "http://www.w3.org/ns/shacl#group";
    pub const DEFAULT_VALUE: &str = "http://www.w3.org/ns/shacl#defaultValue";

    pub const IRI: &str = "http://www.w3.org/ns/shacl#IRI";
    pub const BLANK_NODE: &str = "http://www.w3.org/ns/shacl#BlankNode";
    pub const LITERAL: &str = "http://www.w3.org/ns/shacl#Literal";
    pub const BLANK_NODE_OR_IRI: &str = "http://www.w3.org/ns/shacl#BlankNodeOrIRI";
    pub const BLANK_NODE_OR_LITERAL: &str = "http://www.w3.org/ns/shacl#BlankNodeOrLiteral";
    pub const IRI_OR_LITERAL: &str = "http://www.w3.org/ns/shacl#IRIOrLiteral";

    pub const VALIDATION_REPORT: &str = "http://www.w3.org/ns/shacl#ValidationReport";
    pub const VALIDATION_RESULT: &str = "http://www.w3.org/ns/shacl#ValidationResult";
    pub const CONFORMS: &str = "http://www.w3.org/ns/shacl#conforms";
    pub const RESULT: &str = "http://www.w3.org/ns/shacl#result";
    pub const FOCUS_NODE: &str = "http://www.w3.org/ns/shacl#focusNode";
    pub const RESULT_PATH: &str = "http://www.w3.org/ns/shacl#resultPath";
    pub const VALUE: &str = "http://www.w3.org/ns/shacl#value";
    pub const SOURCE_SHAPE: &str = "http://www.w3.org/ns/shacl#sourceShape";
    pub const SOURCE_CONSTRAINT_COMPONENT: &str =
        "http://www.w3.org/ns/shacl#sourceConstraintComponent";
    pub const RESULT_SEVERITY: &str = "http://www.w3.org/ns/shacl#resultSeverity";
    pub const RESULT_MESSAGE: &str = "http://www.w3.org/ns/shacl#resultMessage";
    pub const VIOLATION: &str = "http://www.w3.org/ns/shacl#Violation";
    pub const WARNING: &str = "http://www.w3.org/ns/shacl#Warning";
    pub const INFO: &str = "http://www.w3.org/ns/shacl#Info";
}

/// Benefit ontology namespace.
pub mod ff {
    pub const NS: &str = "https://foerderfunke.org/default#";
    pub const DATA_FIELD: &str = "https://foerderfunke.org/default#DataField";
    pub const ANSWER_OPTION: &str = "https://foerderfunke.org/default#AnswerOption";
    pub const OBJECT_CONSTRAINTS: &str = "https://foerderfunke.org/default#objectConstraints";
    pub const USAGE_CONSTRAINTS: &str = "https://foerderfunke.org/default#usageConstraints";
    pub const CITIZEN: &str = "https://foerderfunke.org/default#Citizen";
    pub const REQUIREMENT_PROFILE: &str = "https://foerderfunke.org/default#RequirementProfile";
    pub const HAS_MAIN_PERSON_SHAPE: &str = "https://foerderfunke.org/default#hasMainPersonShape";
}

pub mod schema {
    pub const NS: &str = "http://schema.org/";
    pub const QUESTION: &str = "http://schema.org/question";
    pub const CATEGORY: &str = "http://schema.org/category";
}

pub const EX_NS: &str = "http://example.org/";

/// Prefixes every lexshape document may use without declaring them.
pub const WELL_KNOWN_PREFIXES: &[(&str, &str)] = &[
    ("ff", ff::NS),
    ("sh", sh::NS),
    ("rdf", rdf::NS),
    ("rdfs", rdfs::NS),
    ("xsd", xsd::NS),
    ("schema", schema::NS),
    ("ex", EX_NS),
];

/// Local name after the last `#` or `/`.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

/// Part after the last `#` (whole string when there is none).
pub fn fragment(iri: &str) -> &str {
    iri.rsplit('#').next().unwrap_or(iri)
}

/// Expand a `prefix:local` CURIE against [`WELL_KNOWN_PREFIXES`].
pub fn expand_curie(curie: &str) -> Option<String> {
    let (prefix, local) = curie.split_once(':')?;
    if local.starts_with("//") {
        return None;
    }
    WELL_KNOWN_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| format!("{ns}{local}"))
}

/// Resolve a CURIE or absolute IRI reference to a full IRI.
pub fn resolve_reference(reference: &str) -> String {
    let reference = reference.trim();
    if let Some(inner) = reference.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        return inner.to_string();
    }
    expand_curie(reference).unwrap_or_else(|| reference.to_string())
}

/// Compact an IRI to `prefix:local` when a well-known namespace matches.
pub fn compact_iri(iri: &str) -> String {
    compact_with(iri, WELL_KNOWN_PREFIXES.iter().map(|(p, ns)| (*p, *ns)))
        .unwrap_or_else(|| iri.to_string())
}

pub(crate) fn compact_with<'a>(
    iri: &str,
    prefixes: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Option<String> {
    let mut best: Option<(&str, &str)> = None;
    for (prefix, ns) in prefixes {
        if ns.is_empty() {
            continue;
        }
        if let Some(local) = iri.strip_prefix(ns) {
            if is_pn_local(local) && best.map_or(true, |(_, ns_best)| ns.len() > ns_best.len()) {
                best = Some((prefix, ns));
            }
        }
    }
    best.map(|(prefix, ns)| format!("{prefix}:{}", &iri[ns.len()..]))
}

fn is_pn_local(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_alphanumeric() || c == '_' => {
            !local.ends_with('.')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        }
        Some(_) => false,
    }
}
