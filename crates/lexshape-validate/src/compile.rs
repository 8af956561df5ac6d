//! Compile a shapes graph into validation-ready shapes.

use crate::constraints::{Constraint, QualifiedShape};
use crate::ValidateError;
use lexshape_rdf::vocab::{rdf, rdfs, sh};
use lexshape_rdf::{Graph, RdfNode, RdfTerm};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// How a shape selects its focus nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetType {
    Class(String),
    Node(RdfTerm),
    SubjectsOf(String),
    ObjectsOf(String),
    /// The shape is itself a class.
    ImplicitClass(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Violation,
    Warning,
    Info,
}

impl Severity {
    fn from_iri(iri: &str) -> Self {
        match iri {
            sh::WARNING => Self::Warning,
            sh::INFO => Self::Info,
            _ => Self::Violation,
        }
    }

    pub fn iri(&self) -> &'static str {
        match self {
            Self::Violation => sh::VIOLATION,
            Self::Warning => sh::WARNING,
            Self::Info => sh::INFO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyShape {
    pub id: RdfNode,
    /// Predicate IRI of a simple path.
    pub path: String,
    pub constraints: Vec<Constraint>,
    pub severity: Severity,
    pub message: Option<String>,
}

/// A shape referenced from a constraint: `sh:node`, `sh:not`, `sh:and`,
/// `sh:or`, `sh:xone` or `sh:qualifiedValueShape`. Only its constraints
/// matter; targets, severity and messages of the referenced shape are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedShape {
    pub id: RdfNode,
    pub property_shapes: Vec<PropertyShape>,
    pub node_constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
pub struct CompiledShape {
    pub id: RdfNode,
    pub targets: Vec<TargetType>,
    pub property_shapes: Vec<PropertyShape>,
    /// Constraints on the focus node itself.
    pub node_constraints: Vec<Constraint>,
    pub severity: Severity,
    pub message: Option<String>,
}

impl CompiledShape {
    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// SHACL parameters the compiler understands. Any other `sh:` predicate on a
/// shape fails compilation.
const KNOWN_PARAMETERS: &[&str] = &[
    sh::TARGET_CLASS,
    sh::TARGET_NODE,
    sh::TARGET_SUBJECTS_OF,
    sh::TARGET_OBJECTS_OF,
    sh::PROPERTY,
    sh::PATH,
    sh::NAME,
    sh::DESCRIPTION,
    sh::MESSAGE,
    sh::SEVERITY,
    sh::DEACTIVATED,
    sh::ORDER,
    sh::GROUP,
    sh::DEFAULT_VALUE,
    sh::MIN_COUNT,
    sh::MAX_COUNT,
    sh::DATATYPE,
    sh::NODE_KIND,
    sh::CLASS,
    sh::IN,
    sh::HAS_VALUE,
    sh::PATTERN,
    sh::FLAGS,
    sh::MIN_LENGTH,
    sh::MAX_LENGTH,
    sh::MIN_INCLUSIVE,
    sh::MAX_INCLUSIVE,
    sh::MIN_EXCLUSIVE,
    sh::MAX_EXCLUSIVE,
    sh::LANGUAGE_IN,
    sh::UNIQUE_LANG,
    sh::NODE,
    sh::NOT,
    sh::AND,
    sh::OR,
    sh::XONE,
    sh::QUALIFIED_VALUE_SHAPE,
    sh::QUALIFIED_MIN_COUNT,
    sh::QUALIFIED_MAX_COUNT,
    sh::QUALIFIED_VALUE_SHAPES_DISJOINT,
    sh::CLOSED,
    sh::IGNORED_PROPERTIES,
    sh::EQUALS,
    sh::DISJOINT,
    sh::LESS_THAN,
    sh::LESS_THAN_OR_EQUALS,
];

#[derive(Debug, Default)]
pub struct ShapeCompiler {
    shapes: Vec<CompiledShape>,
}

impl ShapeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every targeted shape in `graph`.
    ///
    /// Node shapes and standalone property shapes both count; shapes without
    /// targets are only reachable through `sh:property` or a shape-valued
    /// constraint and are not returned on their own. Deactivated shapes are
    /// dropped.
    pub fn compile(mut self, graph: &Graph) -> Result<Vec<CompiledShape>, ValidateError> {
        let mut candidates: Vec<RdfNode> = Vec::new();
        let mut seen: HashSet<RdfNode> = HashSet::new();
        let mut push = |node: RdfNode, out: &mut Vec<RdfNode>| {
            if seen.insert(node.clone()) {
                out.push(node);
            }
        };

        for node in graph.subjects_of_type(sh::NODE_SHAPE) {
            push(node, &mut candidates);
        }
        for node in graph.subjects_of_type(sh::PROPERTY_SHAPE) {
            push(node, &mut candidates);
        }
        for predicate in [
            sh::TARGET_CLASS,
            sh::TARGET_NODE,
            sh::TARGET_SUBJECTS_OF,
            sh::TARGET_OBJECTS_OF,
        ] {
            for t in graph.triples().filter(|t| t.predicate == predicate) {
                push(t.subject.clone(), &mut candidates);
            }
        }

        for node in candidates {
            if is_true(graph, &node, sh::DEACTIVATED) {
                tracing::debug!(shape = %node, "skipping deactivated shape");
                continue;
            }
            let targets = targets_of(graph, &node);
            if targets.is_empty() {
                continue;
            }
            let shape = ShapeReader::new(graph).targeted_shape(&node, targets)?;
            self.shapes.push(shape);
        }
        Ok(self.shapes)
    }
}

/// Reads shape definitions from one shapes graph. `stack` holds the chain of
/// shapes currently being read, so a shape that refers back to itself is
/// rejected instead of recursing forever.
struct ShapeReader<'g> {
    graph: &'g Graph,
    stack: Vec<RdfNode>,
}

impl<'g> ShapeReader<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            stack: Vec::new(),
        }
    }

    fn targeted_shape(
        &mut self,
        node: &RdfNode,
        targets: Vec<TargetType>,
    ) -> Result<CompiledShape, ValidateError> {
        self.stack.push(node.clone());
        let body = self.shape_body(node);
        self.stack.pop();
        let (property_shapes, node_constraints) = body?;
        Ok(CompiledShape {
            id: node.clone(),
            targets,
            property_shapes,
            node_constraints,
            severity: severity_of(self.graph, node),
            message: message_of(self.graph, node),
        })
    }

    /// Property shapes and focus-node constraints of `node`. A shape with its
    /// own `sh:path` is a property shape and validates that path.
    fn shape_body(
        &mut self,
        node: &RdfNode,
    ) -> Result<(Vec<PropertyShape>, Vec<Constraint>), ValidateError> {
        let graph = self.graph;
        if graph.object(node, sh::PATH).is_some() {
            let property_shapes = self.property_shape(node)?.into_iter().collect();
            return Ok((property_shapes, Vec::new()));
        }

        let mut property_shapes = Vec::new();
        for prop in graph.objects(node, sh::PROPERTY).filter_map(RdfTerm::as_node) {
            if is_true(graph, prop, sh::DEACTIVATED) {
                continue;
            }
            if let Some(compiled) = self.property_shape(prop)? {
                property_shapes.push(compiled);
            }
        }
        link_disjoint_siblings(&mut property_shapes);
        let node_constraints = self.constraints(node)?;
        Ok((property_shapes, node_constraints))
    }

    fn property_shape(&mut self, node: &RdfNode) -> Result<Option<PropertyShape>, ValidateError> {
        let graph = self.graph;
        let Some(path) = graph.object(node, sh::PATH) else {
            tracing::warn!(shape = %node, "property shape without sh:path; skipping");
            return Ok(None);
        };
        let Some(path) = path.as_iri() else {
            tracing::warn!(shape = %node, "only simple predicate paths are supported; skipping");
            return Ok(None);
        };
        Ok(Some(PropertyShape {
            id: node.clone(),
            path: path.to_string(),
            constraints: self.constraints(node)?,
            severity: severity_of(graph, node),
            message: message_of(graph, node),
        }))
    }

    fn nested(&mut self, term: &RdfTerm, owner: &RdfNode) -> Result<Arc<NestedShape>, ValidateError> {
        let Some(node) = term.as_node() else {
            return Err(invalid(owner, format!("expected a shape, found {term}")));
        };
        if self.stack.contains(node) {
            return Err(invalid(owner, format!("recursive reference to shape {node}")));
        }
        if is_true(self.graph, node, sh::DEACTIVATED) {
            return Ok(Arc::new(NestedShape {
                id: node.clone(),
                property_shapes: Vec::new(),
                node_constraints: Vec::new(),
            }));
        }
        self.stack.push(node.clone());
        let body = self.shape_body(node);
        self.stack.pop();
        let (property_shapes, node_constraints) = body?;
        Ok(Arc::new(NestedShape {
            id: node.clone(),
            property_shapes,
            node_constraints,
        }))
    }

    fn constraints(&mut self, node: &RdfNode) -> Result<Vec<Constraint>, ValidateError> {
        let graph = self.graph;
        reject_unknown_parameters(graph, node)?;
        let mut out = value_constraints(graph, node)?;

        for shape in graph.objects(node, sh::NODE) {
            out.push(Constraint::Node(self.nested(shape, node)?));
        }
        for shape in graph.objects(node, sh::NOT) {
            out.push(Constraint::Not(self.nested(shape, node)?));
        }
        let logical: [(&str, fn(Vec<Arc<NestedShape>>) -> Constraint); 3] = [
            (sh::AND, Constraint::And),
            (sh::OR, Constraint::Or),
            (sh::XONE, Constraint::Xone),
        ];
        for (parameter, make) in logical {
            for list in graph.objects(node, parameter) {
                let members = graph
                    .list_or_value(list)
                    .items
                    .iter()
                    .map(|member| self.nested(member, node))
                    .collect::<Result<Vec<_>, _>>()?;
                out.push(make(members));
            }
        }
        out.extend(self.qualified(node)?);

        if is_true(graph, node, sh::CLOSED) {
            out.push(Constraint::Closed(closed_predicates(graph, node)));
        }
        let pairs: [(&str, fn(String) -> Constraint); 4] = [
            (sh::EQUALS, Constraint::Equals),
            (sh::DISJOINT, Constraint::Disjoint),
            (sh::LESS_THAN, Constraint::LessThan),
            (sh::LESS_THAN_OR_EQUALS, Constraint::LessThanOrEquals),
        ];
        for (parameter, make) in pairs {
            for other in graph.objects(node, parameter) {
                let iri = other.as_iri().ok_or_else(|| {
                    invalid(node, format!("{parameter} expects a property IRI, found {other}"))
                })?;
                out.push(make(iri.to_string()));
            }
        }
        Ok(out)
    }

    fn qualified(&mut self, node: &RdfNode) -> Result<Vec<Constraint>, ValidateError> {
        let graph = self.graph;
        let min = count(graph, node, sh::QUALIFIED_MIN_COUNT)?;
        let max = count(graph, node, sh::QUALIFIED_MAX_COUNT)?;
        let Some(shape) = graph.object(node, sh::QUALIFIED_VALUE_SHAPE) else {
            if min.is_some() || max.is_some() {
                return Err(invalid(node, "qualified count without sh:qualifiedValueShape"));
            }
            return Ok(Vec::new());
        };
        if min.is_none() && max.is_none() {
            return Err(invalid(
                node,
                "sh:qualifiedValueShape needs sh:qualifiedMinCount or sh:qualifiedMaxCount",
            ));
        }
        let shape = self.nested(shape, node)?;
        let disjoint = is_true(graph, node, sh::QUALIFIED_VALUE_SHAPES_DISJOINT);
        let qualified = |count| QualifiedShape {
            shape: shape.clone(),
            count,
            disjoint,
            siblings: Vec::new(),
        };
        let mut out = Vec::new();
        if let Some(min) = min {
            out.push(Constraint::QualifiedMinCount(qualified(min)));
        }
        if let Some(max) = max {
            out.push(Constraint::QualifiedMaxCount(qualified(max)));
        }
        Ok(out)
    }
}

fn invalid(shape: &RdfNode, message: impl Into<String>) -> ValidateError {
    ValidateError::InvalidConstraint {
        shape: shape.to_string(),
        message: message.into(),
    }
}

fn reject_unknown_parameters(graph: &Graph, node: &RdfNode) -> Result<(), ValidateError> {
    match graph
        .statements_about(node)
        .find(|t| t.predicate.starts_with(sh::NS) && !KNOWN_PARAMETERS.contains(&t.predicate.as_str()))
    {
        Some(t) => Err(ValidateError::UnsupportedParameter {
            shape: node.to_string(),
            parameter: t.predicate.clone(),
        }),
        None => Ok(()),
    }
}

fn count(graph: &Graph, node: &RdfNode, predicate: &str) -> Result<Option<usize>, ValidateError> {
    graph
        .object(node, predicate)
        .map(|v| {
            v.lexical()
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid(node, format!("{predicate} expects a non-negative integer, got {v}")))
        })
        .transpose()
}

/// Predicates a closed shape allows: the simple paths of its property shapes,
/// `sh:ignoredProperties` and `rdf:type`.
fn closed_predicates(graph: &Graph, node: &RdfNode) -> BTreeSet<String> {
    let mut allowed = BTreeSet::from([rdf::TYPE.to_string()]);
    for prop in graph.objects(node, sh::PROPERTY).filter_map(RdfTerm::as_node) {
        if let Some(path) = graph.object(prop, sh::PATH).and_then(RdfTerm::as_iri) {
            allowed.insert(path.to_string());
        }
    }
    for list in graph.objects(node, sh::IGNORED_PROPERTIES) {
        allowed.extend(
            graph
                .list_or_value(list)
                .items
                .iter()
                .filter_map(RdfTerm::as_iri)
                .map(str::to_string),
        );
    }
    allowed
}

/// With `sh:qualifiedValueShapesDisjoint`, a qualified shape also needs the
/// qualified shapes of its sibling property shapes.
fn link_disjoint_siblings(property_shapes: &mut [PropertyShape]) {
    let qualified: Vec<(usize, Arc<NestedShape>)> = property_shapes
        .iter()
        .enumerate()
        .flat_map(|(i, prop)| {
            prop.constraints.iter().filter_map(move |c| match c {
                Constraint::QualifiedMinCount(q) | Constraint::QualifiedMaxCount(q) => {
                    Some((i, q.shape.clone()))
                }
                _ => None,
            })
        })
        .collect();
    if qualified.is_empty() {
        return;
    }
    for (i, prop) in property_shapes.iter_mut().enumerate() {
        for constraint in &mut prop.constraints {
            if let Constraint::QualifiedMinCount(q) | Constraint::QualifiedMaxCount(q) = constraint {
                if !q.disjoint {
                    continue;
                }
                let mut siblings: Vec<Arc<NestedShape>> = Vec::new();
                for (j, shape) in &qualified {
                    if *j != i && !siblings.iter().any(|s| s.id == shape.id) {
                        siblings.push(shape.clone());
                    }
                }
                q.siblings = siblings;
            }
        }
    }
}

/// Value-level constraint components read directly from `node`.
fn value_constraints(graph: &Graph, node: &RdfNode) -> Result<Vec<Constraint>, ValidateError> {
    let mut out = Vec::new();
    if let Some(min) = count(graph, node, sh::MIN_COUNT)? {
        out.push(Constraint::MinCount(min));
    }
    if let Some(max) = count(graph, node, sh::MAX_COUNT)? {
        out.push(Constraint::MaxCount(max));
    }
    if let Some(min) = count(graph, node, sh::MIN_LENGTH)? {
        out.push(Constraint::MinLength(min));
    }
    if let Some(max) = count(graph, node, sh::MAX_LENGTH)? {
        out.push(Constraint::MaxLength(max));
    }
    if let Some(dt) = graph.object(node, sh::DATATYPE).and_then(RdfTerm::as_iri) {
        out.push(Constraint::Datatype(dt.to_string()));
    }
    if let Some(kind) = graph.object(node, sh::NODE_KIND).and_then(RdfTerm::as_iri) {
        out.push(Constraint::NodeKind(kind.to_string()));
    }
    for class in graph.objects(node, sh::CLASS).filter_map(RdfTerm::as_iri) {
        out.push(Constraint::Class(class.to_string()));
    }
    for value in graph.objects(node, sh::HAS_VALUE) {
        out.push(Constraint::HasValue(value.clone()));
    }
    if let Some(list) = graph.object(node, sh::IN) {
        out.push(Constraint::In(graph.list_or_value(list).items));
    }
    let ranges: [(&str, fn(RdfTerm) -> Constraint); 4] = [
        (sh::MIN_INCLUSIVE, Constraint::MinInclusive),
        (sh::MAX_INCLUSIVE, Constraint::MaxInclusive),
        (sh::MIN_EXCLUSIVE, Constraint::MinExclusive),
        (sh::MAX_EXCLUSIVE, Constraint::MaxExclusive),
    ];
    for (predicate, make) in ranges {
        if let Some(bound) = graph.object(node, predicate) {
            out.push(make(bound.clone()));
        }
    }
    if let Some(pattern) = graph.literal(node, sh::PATTERN) {
        let flags = graph.literal(node, sh::FLAGS).map(|f| f.lexical.clone());
        out.push(Constraint::Pattern(compile_pattern(
            &pattern.lexical,
            flags.as_deref(),
        )?));
    }
    if let Some(list) = graph.object(node, sh::LANGUAGE_IN) {
        let langs = graph
            .list_or_value(list)
            .items
            .iter()
            .map(RdfTerm::lexical)
            .collect();
        out.push(Constraint::LanguageIn(langs));
    }
    if is_true(graph, node, sh::UNIQUE_LANG) {
        out.push(Constraint::UniqueLang);
    }
    Ok(out)
}

/// Compiled `sh:pattern` with its `sh:flags`.
#[derive(Debug, Clone)]
pub struct PatternConstraint {
    pub pattern: String,
    pub flags: Option<String>,
    pub regex: Regex,
}

impl PartialEq for PatternConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.flags == other.flags
    }
}

fn compile_pattern(pattern: &str, flags: Option<&str>) -> Result<PatternConstraint, ValidateError> {
    let source = match flags {
        Some(f) => {
            let mut prefix = String::from("(?");
            for c in f.chars() {
                if matches!(c, 'i' | 'm' | 's' | 'x') {
                    prefix.push(c);
                }
            }
            if prefix.len() > 2 {
                prefix.push(')');
                format!("{prefix}{pattern}")
            } else {
                pattern.to_string()
            }
        }
        None => pattern.to_string(),
    };
    let regex = Regex::new(&source).map_err(|e| ValidateError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    Ok(PatternConstraint {
        pattern: pattern.to_string(),
        flags: flags.map(str::to_string),
        regex,
    })
}

fn targets_of(graph: &Graph, node: &RdfNode) -> Vec<TargetType> {
    let mut targets = Vec::new();
    for class in graph.objects(node, sh::TARGET_CLASS).filter_map(RdfTerm::as_iri) {
        targets.push(TargetType::Class(class.to_string()));
    }
    for target in graph.objects(node, sh::TARGET_NODE) {
        targets.push(TargetType::Node(target.clone()));
    }
    for p in graph.objects(node, sh::TARGET_SUBJECTS_OF).filter_map(RdfTerm::as_iri) {
        targets.push(TargetType::SubjectsOf(p.to_string()));
    }
    for p in graph.objects(node, sh::TARGET_OBJECTS_OF).filter_map(RdfTerm::as_iri) {
        targets.push(TargetType::ObjectsOf(p.to_string()));
    }
    if let Some(iri) = node.as_iri() {
        if graph.has_type(node, rdfs::CLASS) {
            targets.push(TargetType::ImplicitClass(iri.to_string()));
        }
    }
    targets
}

fn is_true(graph: &Graph, node: &RdfNode, predicate: &str) -> bool {
    graph
        .literal(node, predicate)
        .is_some_and(|l| l.lexical == "true")
}

fn severity_of(graph: &Graph, node: &RdfNode) -> Severity {
    graph
        .object(node, sh::SEVERITY)
        .and_then(RdfTerm::as_iri)
        .map(Severity::from_iri)
        .unwrap_or_default()
}

fn message_of(graph: &Graph, node: &RdfNode) -> Option<String> {
    graph.literal(node, sh::MESSAGE).map(|l| l.lexical.clone())
}

/// `rdf:type` check with optional `rdfs:subClassOf` closure.
pub(crate) fn is_instance_of(
    data: &Graph,
    schema: &Graph,
    node: &RdfNode,
    class: &str,
    rdfs_closure: bool,
) -> bool {
    if !rdfs_closure {
        return data.has_type(node, class);
    }
    let mut frontier: Vec<String> = data
        .objects(node, rdf::TYPE)
        .filter_map(RdfTerm::as_iri)
        .map(str::to_string)
        .collect();
    let mut visited: HashSet<String> = HashSet::new();
    while let Some(current) = frontier.pop() {
        if current == class {
            return true;
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        let current_node = RdfNode::iri(current);
        for g in [data, schema] {
            frontier.extend(
                g.objects(&current_node, rdfs::SUB_CLASS_OF)
                    .filter_map(RdfTerm::as_iri)
                    .map(str::to_string),
            );
        }
    }
    false
}
