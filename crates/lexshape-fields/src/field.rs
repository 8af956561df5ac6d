//! The `DataField` record and its constraint values.

use crate::datatype::XsdDatatype;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Keys used in [`DataField::constraints`].
pub mod constraint_keys {
    pub const DATATYPE: &str = "datatype";
    pub const ALLOWED_VALUES: &str = "allowed_values";
    pub const PATTERN: &str = "pattern";
    pub const FLAGS: &str = "flags";
    pub const MIN_INCLUSIVE: &str = "minInclusive";
    pub const MAX_INCLUSIVE: &str = "maxInclusive";
    pub const MIN_EXCLUSIVE: &str = "minExclusive";
    pub const MAX_EXCLUSIVE: &str = "maxExclusive";
    pub const MIN_LENGTH: &str = "minLength";
    pub const MAX_LENGTH: &str = "maxLength";
    pub const MIN_COUNT: &str = "minCount";
    pub const MAX_COUNT: &str = "maxCount";
    pub const QUALIFIED_MIN_COUNT: &str = "qualifiedMinCount";
    pub const QUALIFIED_MAX_COUNT: &str = "qualifiedMaxCount";
    pub const QUALIFIED_VALUE_SHAPE: &str = "qualifiedValueShape";
    pub const TARGET_OBJECTS_OF: &str = "targetObjectsOf";
    pub const TARGET_SUBJECTS_OF: &str = "targetSubjectsOf";
    pub const LANGUAGE_IN: &str = "languageIn";
    pub const UNIQUE_LANG: &str = "uniqueLang";
    pub const CATEGORY: &str = "category";
}

/// One permitted value of an enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub label: String,
}

/// Value stored under a constraint key.
///
/// Empty sequences are never stored, so the untagged encoding stays
/// unambiguous on reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    Text(String),
    Options(Vec<AnswerOption>),
    List(Vec<String>),
}

impl ConstraintValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_options(&self) -> Option<&[AnswerOption]> {
        match self {
            Self::Options(opts) => Some(opts),
            _ => None,
        }
    }
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Options(opts) => {
                let ids: Vec<&str> = opts.iter().map(|o| o.id.as_str()).collect();
                write!(f, "[{}]", ids.join(", "))
            }
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// A named, reusable property definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    pub name: String,
    /// Property reference, usually a CURIE such as `ff:age`.
    pub path: String,
    pub datatype: XsdDatatype,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub constraints: BTreeMap<String, ConstraintValue>,
}

impl DataField {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        datatype: XsdDatatype,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            datatype,
            description: description.into(),
            examples: Vec::new(),
            synonyms: Vec::new(),
            constraints: BTreeMap::new(),
        }
    }

    pub fn constraint_text(&self, key: &str) -> Option<&str> {
        self.constraints.get(key).and_then(ConstraintValue::as_text)
    }

    pub fn allowed_values(&self) -> Option<&[AnswerOption]> {
        self.constraints
            .get(constraint_keys::ALLOWED_VALUES)
            .and_then(ConstraintValue::as_options)
    }

    pub fn min_count(&self) -> u64 {
        self.constraint_text(constraint_keys::MIN_COUNT)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn pattern(&self) -> Option<&str> {
        self.constraint_text(constraint_keys::PATTERN)
    }

    /// Case-insensitive exact match on name or synonym.
    pub(crate) fn matches_exactly(&self, term_lower: &str) -> bool {
        self.name.to_lowercase() == term_lower
            || self.synonyms.iter().any(|s| s.to_lowercase() == term_lower)
    }

    /// Case-insensitive substring match on name, synonyms, or examples.
    pub(crate) fn matches_partially(&self, term_lower: &str) -> bool {
        self.name.to_lowercase().contains(term_lower)
            || self
                .synonyms
                .iter()
                .any(|s| s.to_lowercase().contains(term_lower))
            || self
                .examples
                .iter()
                .any(|e| e.to_lowercase().contains(term_lower))
    }
}
