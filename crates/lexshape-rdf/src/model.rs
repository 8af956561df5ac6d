//! Owned RDF term model.

use crate::vocab;
use std::fmt;

/// A subject-position node: IRI or blank node (label without the `_:` prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfNode {
    Iri(String),
    Blank(String),
}

impl RdfNode {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Self::Blank(label.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Blank(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }
}

impl fmt::Display for RdfNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(label) => write!(f, "_:{label}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RdfLiteral {
    pub lexical: String,
    /// `None` for plain (`xsd:string`) and language-tagged literals.
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl RdfLiteral {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        let datatype = if datatype == vocab::xsd::STRING {
            None
        } else {
            Some(datatype)
        };
        Self {
            lexical: lexical.into(),
            datatype,
            language: None,
        }
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    /// Effective datatype IRI (`xsd:string` / `rdf:langString` when untyped).
    pub fn datatype_iri(&self) -> &str {
        match (&self.datatype, &self.language) {
            (Some(dt), _) => dt,
            (None, Some(_)) => vocab::rdf::LANG_STRING,
            (None, None) => vocab::xsd::STRING,
        }
    }
}

impl fmt::Display for RdfLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_literal(&self.lexical))?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{dt}>")
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfTerm {
    Node(RdfNode),
    Literal(RdfLiteral),
}

impl RdfTerm {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Node(RdfNode::Iri(iri.into()))
    }

    pub fn as_node(&self) -> Option<&RdfNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Literal(_) => None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        self.as_node().and_then(RdfNode::as_iri)
    }

    pub fn as_literal(&self) -> Option<&RdfLiteral> {
        match self {
            Self::Literal(lit) => Some(lit),
            Self::Node(_) => None,
        }
    }

    /// Lexical form for literals, IRI text for IRIs, `_:label` for blank nodes.
    pub fn lexical(&self) -> String {
        match self {
            Self::Node(RdfNode::Iri(iri)) => iri.clone(),
            Self::Node(node @ RdfNode::Blank(_)) => node.to_string(),
            Self::Literal(lit) => lit.lexical.clone(),
        }
    }
}

impl From<RdfNode> for RdfTerm {
    fn from(node: RdfNode) -> Self {
        Self::Node(node)
    }
}

impl From<RdfLiteral> for RdfTerm {
    fn from(lit: RdfLiteral) -> Self {
        Self::Literal(lit)
    }
}

impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => node.fmt(f),
            Self::Literal(lit) => lit.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: RdfNode,
    pub predicate: String,
    pub object: RdfTerm,
}

impl Triple {
    pub fn new(subject: RdfNode, predicate: impl Into<String>, object: impl Into<RdfTerm>) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

pub(crate) fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn unescape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
