//! Closed set of XSD datatypes with literal construction and checking.

use crate::FieldError;
use lexshape_rdf::vocab::xsd;
use lexshape_rdf::{is_valid_lexical, RdfLiteral};
use std::fmt;

pub const XSD_TAG_PREFIX: &str = "xsd:";

/// An XSD datatype tag (`xsd:integer`, ...). Unknown XSD names are kept in
/// [`XsdDatatype::Other`] and treated as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum XsdDatatype {
    #[default]
    String,
    Integer,
    Int,
    Long,
    Decimal,
    Double,
    Float,
    Boolean,
    Date,
    DateTime,
    AnyUri,
    Other(String),
}

impl XsdDatatype {
    /// Parse an `xsd:`-prefixed tag.
    pub fn parse(tag: &str) -> Result<Self, FieldError> {
        let local = tag
            .trim()
            .strip_prefix(XSD_TAG_PREFIX)
            .ok_or_else(|| FieldError::InvalidDatatype(tag.to_string()))?;
        Self::from_local_name(local).ok_or_else(|| FieldError::InvalidDatatype(tag.to_string()))
    }

    /// Datatype for a full XSD IRI.
    pub fn from_iri(iri: &str) -> Option<Self> {
        iri.strip_prefix(xsd::NS).and_then(Self::from_local_name)
    }

    fn from_local_name(local: &str) -> Option<Self> {
        if local.is_empty() || !local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        Some(match local {
            "string" => Self::String,
            "integer" => Self::Integer,
            "int" => Self::Int,
            "long" => Self::Long,
            "decimal" => Self::Decimal,
            "double" => Self::Double,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "anyURI" => Self::AnyUri,
            other => Self::Other(other.to_string()),
        })
    }

    pub fn local_name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Int => "int",
            Self::Long => "long",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::AnyUri => "anyURI",
            Self::Other(name) => name,
        }
    }

    pub fn tag(&self) -> String {
        format!("{XSD_TAG_PREFIX}{}", self.local_name())
    }

    pub fn iri(&self) -> String {
        format!("{}{}", xsd::NS, self.local_name())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Int | Self::Long | Self::Decimal | Self::Double | Self::Float
        )
    }

    /// Check that `value` is a valid lexical form for this datatype.
    ///
    /// The canonical literal produced by [`XsdDatatype::literal`] is what gets
    /// checked, so anything accepted here also passes `sh:datatype` later.
    /// Booleans are limited to `true`/`false` in any case.
    pub fn check_lexical(&self, value: &str) -> Result<(), String> {
        let canonical = self.literal(value);
        let ok = match self {
            Self::Boolean => matches!(canonical.lexical.as_str(), "true" | "false"),
            Self::AnyUri => {
                !canonical.lexical.is_empty() && is_valid_lexical(&self.iri(), &canonical.lexical)
            }
            _ => is_valid_lexical(&self.iri(), &canonical.lexical),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("{value:?} is not a valid {}", self.tag()))
        }
    }

    /// Typed literal for `value`; numeric and boolean forms are canonicalized.
    pub fn literal(&self, value: &str) -> RdfLiteral {
        let v = value.trim();
        match self {
            Self::String => RdfLiteral::plain(value),
            Self::Integer | Self::Int | Self::Long => {
                let lexical = v
                    .parse::<i64>()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|_| v.to_string());
                RdfLiteral::typed(lexical, self.iri())
            }
            Self::Boolean => RdfLiteral::typed(v.to_ascii_lowercase(), self.iri()),
            _ => RdfLiteral::typed(v, self.iri()),
        }
    }
}

impl fmt::Display for XsdDatatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{XSD_TAG_PREFIX}{}", self.local_name())
    }
}

impl TryFrom<String> for XsdDatatype {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<XsdDatatype> for String {
    fn from(value: XsdDatatype) -> Self {
        value.tag()
    }
}

impl std::str::FromStr for XsdDatatype {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
