//! Turtle parsing (Sophia) and writing.

use crate::graph::Graph;
use crate::model::{escape_literal, unescape_literal, RdfLiteral, RdfNode, RdfTerm, Triple};
use crate::vocab::{self, rdf, xsd};
use crate::RdfError;
use sophia::api::source::TripleSource;
use sophia::api::triple::Triple as _;
use std::collections::BTreeSet;
use std::fmt::Write as _;

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct TurtleSinkError {
    message: String,
}

impl From<RdfError> for TurtleSinkError {
    fn from(value: RdfError) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

fn parse_term_display(term: &str) -> Result<RdfTerm, RdfError> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(RdfTerm::iri(rest));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(RdfTerm::Node(RdfNode::blank(rest)));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    end_quote = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = end_quote else {
            return Err(RdfError::Term(format!("missing closing quote: {s}")));
        };

        let lexical = unescape_literal(&s[1..end]);
        let rest = s[end + 1..].trim();

        if let Some(lang) = rest.strip_prefix('@') {
            return Ok(RdfTerm::Literal(RdfLiteral::lang(lexical, lang)));
        }
        if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            if dt == rdf::LANG_STRING {
                return Ok(RdfTerm::Literal(RdfLiteral::plain(lexical)));
            }
            return Ok(RdfTerm::Literal(RdfLiteral::typed(lexical, dt)));
        }
        return Ok(RdfTerm::Literal(RdfLiteral::plain(lexical)));
    }

    Err(RdfError::Term(s.to_string()))
}

fn parse_node_display(term: &str) -> Result<RdfNode, RdfError> {
    match parse_term_display(term)? {
        RdfTerm::Node(node) => Ok(node),
        RdfTerm::Literal(_) => Err(RdfError::Term(format!(
            "expected IRI/blank node, got literal: {term}"
        ))),
    }
}

/// `(prefix, namespace)` pairs declared with `@prefix` or `PREFIX`.
pub fn declared_prefixes(text: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim_start();
        let rest = if let Some(rest) = line.strip_prefix("@prefix") {
            rest
        } else if line.get(..6).is_some_and(|kw| kw.eq_ignore_ascii_case("prefix")) {
            &line[6..]
        } else {
            continue;
        };
        let Some((prefix, tail)) = rest.split_once(':') else {
            continue;
        };
        let Some(ns) = tail
            .trim_start()
            .strip_prefix('<')
            .and_then(|t| t.split_once('>'))
            .map(|(ns, _)| ns)
        else {
            continue;
        };
        out.push((prefix.trim().to_string(), ns.to_string()));
    }
    out
}

/// Parse a Turtle document into a [`Graph`].
///
/// Prefix declarations are kept as graph bindings so [`write_turtle`] can
/// reuse them.
pub fn parse_turtle(text: &str) -> Result<Graph, RdfError> {
    let cursor = std::io::Cursor::new(text.as_bytes());
    let reader = std::io::BufReader::new(cursor);

    let mut graph = Graph::new();
    let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
    parser
        .try_for_each_triple(|t| -> Result<(), TurtleSinkError> {
            let subject = parse_node_display(&t.s().to_string())?;
            let RdfNode::Iri(predicate) = parse_node_display(&t.p().to_string())? else {
                return Ok(());
            };
            let object = parse_term_display(&t.o().to_string())?;
            graph.insert(Triple {
                subject,
                predicate,
                object,
            });
            Ok(())
        })
        .map_err(|e| RdfError::Parse(e.to_string()))?;

    for (prefix, ns) in declared_prefixes(text) {
        graph.bind_prefix(&prefix, &ns);
    }

    Ok(graph)
}

/// Serialize a graph as Turtle, one subject block per node.
///
/// Prefixes come from the graph bindings plus the well-known table, and only
/// the ones actually used are declared. Blank nodes are written by label.
pub fn write_turtle(graph: &Graph) -> String {
    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut body = String::new();

    for subject in graph.subjects() {
        let _ = write!(body, "{}", render_node(graph, &subject, &mut used));
        let statements: Vec<&Triple> = graph.statements_about(&subject).collect();

        // rdf:type first, rendered as `a`.
        let mut ordered: Vec<&Triple> = statements
            .iter()
            .copied()
            .filter(|t| t.predicate == rdf::TYPE)
            .collect();
        ordered.extend(statements.iter().copied().filter(|t| t.predicate != rdf::TYPE));

        let mut last_predicate: Option<&str> = None;
        for (i, t) in ordered.iter().enumerate() {
            let object = render_term(graph, &t.object, &mut used);
            if last_predicate == Some(t.predicate.as_str()) {
                let _ = write!(body, ",\n        {object}");
            } else {
                if i > 0 {
                    body.push_str(" ;");
                }
                let predicate = if t.predicate == rdf::TYPE {
                    "a".to_string()
                } else {
                    render_iri(graph, &t.predicate, &mut used)
                };
                if i == 0 {
                    let _ = write!(body, " {predicate} {object}");
                } else {
                    let _ = write!(body, "\n    {predicate} {object}");
                }
            }
            last_predicate = Some(t.predicate.as_str());
        }
        body.push_str(" .\n\n");
    }

    let mut out = String::new();
    for prefix in &used {
        if let Some(ns) = namespace_for(graph, prefix) {
            let _ = writeln!(out, "@prefix {prefix}: <{ns}> .");
        }
    }
    if !used.is_empty() {
        out.push('\n');
    }
    out.push_str(body.trim_end());
    out.push('\n');
    out
}

fn namespace_for(graph: &Graph, prefix: &str) -> Option<String> {
    graph
        .prefixes()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| ns.to_string())
        .or_else(|| {
            vocab::WELL_KNOWN_PREFIXES
                .iter()
                .find(|(p, _)| *p == prefix)
                .map(|(_, ns)| ns.to_string())
        })
}

fn render_iri(graph: &Graph, iri: &str, used: &mut BTreeSet<String>) -> String {
    let compact = graph.compact(iri);
    if compact == iri {
        return format!("<{iri}>");
    }
    if let Some((prefix, _)) = compact.split_once(':') {
        used.insert(prefix.to_string());
    }
    compact
}

fn render_node(graph: &Graph, node: &RdfNode, used: &mut BTreeSet<String>) -> String {
    match node {
        RdfNode::Iri(iri) => render_iri(graph, iri, used),
        RdfNode::Blank(label) => format!("_:{}", sanitize_blank_label(label)),
    }
}

fn render_term(graph: &Graph, term: &RdfTerm, used: &mut BTreeSet<String>) -> String {
    match term {
        RdfTerm::Node(node) => render_node(graph, node, used),
        RdfTerm::Literal(lit) => {
            let quoted = format!("\"{}\"", escape_literal(&lit.lexical));
            if let Some(lang) = &lit.language {
                format!("{quoted}@{lang}")
            } else if let Some(dt) = &lit.datatype {
                if dt == xsd::STRING {
                    quoted
                } else {
                    format!("{quoted}^^{}", render_iri(graph, dt, used))
                }
            } else {
                quoted
            }
        }
    }
}

fn sanitize_blank_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 1);
    for c in label.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.insert(0, 'b');
    }
    out
}
