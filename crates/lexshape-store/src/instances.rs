//! Synthetic citizen records used as validation fixtures.

use crate::fsutil::{
    check_record_id, ensure_dir, read_to_string, record_dirs, remove_record_dir, write_atomic,
};
use crate::StoreError;
use lexshape_fields::{DataField, FieldRegistry};
use lexshape_rdf::vocab::{self, ff, rdf};
use lexshape_rdf::{parse_turtle, write_turtle, Graph, RdfNode, RdfTerm};
use lexshape_validate::{messages_from_report, InferenceMode, ShaclValidator};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PROPERTIES_FILE: &str = "properties.yaml";
const INSTANCE_FILE: &str = "instance.ttl";

#[derive(Debug, Clone, PartialEq)]
pub struct CitizenInstance {
    pub instance_id: String,
    pub properties: BTreeMap<String, String>,
    pub graph: Graph,
}

impl CitizenInstance {
    /// IRI of the citizen node, `ff:citizen_<id>`.
    pub fn subject(&self) -> RdfNode {
        citizen_node(&self.instance_id)
    }

    pub fn to_turtle(&self) -> String {
        write_turtle(&self.graph)
    }
}

/// Normalized identifier: spaces and hyphens become `_`, then lower-cased.
pub fn instance_id(name: &str) -> String {
    name.replace([' ', '-'], "_").to_lowercase()
}

/// Characters that cannot appear in an IRI reference.
const IRI_FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '^', '`', '\\'];

/// An instance id names both a record directory and the citizen IRI.
fn check_instance_id(id: &str) -> Result<(), StoreError> {
    check_record_id(id)?;
    if id
        .chars()
        .any(|c| IRI_FORBIDDEN.contains(&c) || c.is_whitespace())
    {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn citizen_node(id: &str) -> RdfNode {
    RdfNode::iri(format!("{}citizen_{id}", ff::NS))
}

#[derive(Debug)]
pub struct InstanceStore {
    dir: PathBuf,
    registry: Arc<FieldRegistry>,
    instances: RwLock<BTreeMap<String, CitizenInstance>>,
}

impl InstanceStore {
    pub fn open(dir: impl Into<PathBuf>, registry: Arc<FieldRegistry>) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        let store = Self {
            dir,
            registry,
            instances: RwLock::new(BTreeMap::new()),
        };
        store.load_all()?;
        Ok(store)
    }

    pub fn load_all(&self) -> Result<usize, StoreError> {
        let mut loaded = BTreeMap::new();
        for record in record_dirs(&self.dir)? {
            match load_instance(&record) {
                Ok(instance) => {
                    loaded.insert(instance.instance_id.clone(), instance);
                }
                Err(err) => {
                    tracing::warn!(dir = %record.display(), error = %err, "skipping unreadable instance record");
                }
            }
        }
        let count = loaded.len();
        *self.instances.write() = loaded;
        tracing::debug!(dir = %self.dir.display(), instances = count, "loaded instance store");
        Ok(count)
    }

    /// Validate `properties` against the registry, render the RDF graph and
    /// persist both. An existing instance with the same id is overwritten.
    pub fn create_instance<K, V>(
        &self,
        name: &str,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<CitizenInstance, StoreError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let id = instance_id(name);
        check_instance_id(&id)?;
        let properties: BTreeMap<String, String> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let subject = citizen_node(&id);
        let mut graph = Graph::new();
        graph.bind_prefix("ff", ff::NS);
        graph.bind_prefix("xsd", vocab::xsd::NS);
        graph.add(subject.clone(), rdf::TYPE, RdfTerm::iri(ff::CITIZEN));
        for (name, value) in &properties {
            let field = self
                .registry
                .get_field(name)
                .ok_or_else(|| StoreError::Validation {
                    field: name.clone(),
                    message: format!("Unknown field: {name}"),
                })?;
            validate_value(&field, value)?;
            if value.trim().is_empty() {
                continue;
            }
            graph.add(
                subject.clone(),
                &vocab::resolve_reference(&field.path),
                field.datatype.literal(value),
            );
        }

        let instance = CitizenInstance {
            instance_id: id.clone(),
            properties,
            graph,
        };
        let mut instances = self.instances.write();
        self.save(&instance)?;
        if instances.insert(id.clone(), instance.clone()).is_some() {
            tracing::info!(instance = %id, "replaced citizen instance");
        } else {
            tracing::info!(instance = %id, "created citizen instance");
        }
        Ok(instance)
    }

    pub fn get(&self, id: &str) -> Option<CitizenInstance> {
        self.instances.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<CitizenInstance> {
        self.instances.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut instances = self.instances.write();
        if !instances.contains_key(id) {
            return Err(StoreError::UnknownInstance(id.to_string()));
        }
        remove_record_dir(&self.dir.join(id))?;
        instances.remove(id);
        tracing::info!(instance = %id, "deleted citizen instance");
        Ok(())
    }

    /// Check the instance graph against `shape` without inference. Messages
    /// are collected only when the instance does not conform.
    pub fn validate_instance(
        &self,
        id: &str,
        shape: &Graph,
        validator: &dyn ShaclValidator,
    ) -> Result<(bool, Vec<String>), StoreError> {
        let instance = self
            .get(id)
            .ok_or_else(|| StoreError::UnknownInstance(id.to_string()))?;
        let outcome = validator.validate(&instance.graph, shape, InferenceMode::None)?;
        let messages = if outcome.conforms {
            Vec::new()
        } else {
            messages_from_report(&outcome.report)
        };
        tracing::debug!(instance = %id, conforms = outcome.conforms, messages = messages.len(), "validated instance");
        Ok((outcome.conforms, messages))
    }

    fn save(&self, instance: &CitizenInstance) -> Result<(), StoreError> {
        let record = self.dir.join(&instance.instance_id);
        ensure_dir(&record)?;
        write_atomic(
            &record.join(PROPERTIES_FILE),
            &serde_yaml::to_string(&instance.properties)?,
        )?;
        write_atomic(&record.join(INSTANCE_FILE), &write_turtle(&instance.graph))
    }
}

/// Cardinality, datatype and pattern checks for one property value.
fn validate_value(field: &DataField, value: &str) -> Result<(), StoreError> {
    let invalid = |message: String| StoreError::Validation {
        field: field.name.clone(),
        message,
    };
    if value.trim().is_empty() {
        if field.min_count() > 0 {
            return Err(invalid(format!(
                "a value is required (minCount {})",
                field.min_count()
            )));
        }
        return Ok(());
    }
    field.datatype.check_lexical(value).map_err(invalid)?;
    if let Some(pattern) = field.pattern() {
        let regex = Regex::new(&format!("^(?:{pattern})"))
            .map_err(|e| invalid(format!("invalid pattern {pattern:?}: {e}")))?;
        if !regex.is_match(value) {
            return Err(invalid(format!(
                "{value:?} does not match pattern {pattern:?}"
            )));
        }
    }
    Ok(())
}

fn load_instance(record: &Path) -> Result<CitizenInstance, StoreError> {
    let instance_id = record
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let properties: BTreeMap<String, String> =
        serde_yaml::from_str(&read_to_string(&record.join(PROPERTIES_FILE))?)?;
    let graph = parse_turtle(&read_to_string(&record.join(INSTANCE_FILE))?)?;
    Ok(CitizenInstance {
        instance_id,
        properties,
        graph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexshape_fields::{constraint_keys, ConstraintValue, XsdDatatype};
    use lexshape_rdf::RdfLiteral;
    use tempfile::tempdir;

    fn registry() -> Arc<FieldRegistry> {
        let registry = FieldRegistry::in_memory();
        registry
            .add_field(DataField::new("age", "ff:age", XsdDatatype::Integer, "Age in years"))
            .expect("add");
        let mut plz = DataField::new("plz", "ff:plz", XsdDatatype::String, "Postal code");
        plz.constraints.insert(
            constraint_keys::PATTERN.into(),
            ConstraintValue::Text("[0-9]{5}".into()),
        );
        plz.constraints.insert(
            constraint_keys::MIN_COUNT.into(),
            ConstraintValue::Text("1".into()),
        );
        registry.add_field(plz).expect("add");
        Arc::new(registry)
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(instance_id("Jane Doe"), "jane_doe");
        assert_eq!(instance_id("Hans-Peter Müller"), "hans_peter_müller");
    }

    #[test]
    fn integer_property_becomes_typed_literal() {
        let dir = tempdir().expect("tempdir");
        let store = InstanceStore::open(dir.path(), registry()).expect("open");
        let instance = store
            .create_instance("Jane Doe", [("age", "17")])
            .expect("create");
        assert_eq!(instance.instance_id, "jane_doe");
        assert_eq!(instance.properties["age"], "17");
        let age = instance
            .graph
            .literal(&instance.subject(), &format!("{}age", ff::NS))
            .expect("age");
        assert_eq!(age, &RdfLiteral::typed("17", vocab::xsd::INTEGER));
        assert!(instance.graph.has_type(&instance.subject(), ff::CITIZEN));

        let reopened = InstanceStore::open(dir.path(), registry()).expect("reopen");
        assert_eq!(reopened.get("jane_doe"), Some(instance));
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = tempdir().expect("tempdir");
        let store = InstanceStore::open(dir.path(), registry()).expect("open");
        let err = store
            .create_instance("x", [("age", "seventeen")])
            .expect_err("not an integer");
        assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "age"));
        assert!(store.create_instance("x", [("plz", "1234a")]).is_err());
        assert!(store.create_instance("x", [("plz", "")]).is_err());
        assert!(store.create_instance("x", [("plz", "10115")]).is_ok());
        let unknown = store
            .create_instance("x", [("shoe_size", "42")])
            .expect_err("unknown field");
        assert!(unknown.to_string().contains("Unknown field: shoe_size"));
    }

    #[test]
    fn names_that_cannot_form_an_iri_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let store = InstanceStore::open(dir.path(), registry()).expect("open");
        for name in ["Jane <Doe>", "a\"b", "x{y}", "pipe|d", "back\\slash", "tab\there"] {
            let err = store
                .create_instance(name, [("age", "17")])
                .expect_err(name);
            assert!(matches!(err, StoreError::InvalidId(_)), "{name}: {err}");
        }
        assert!(store.is_empty());
        store
            .create_instance("Dr. Erika (Musterfrau)", [("age", "40")])
            .expect("punctuation outside prefixed names");

        let reopened = InstanceStore::open(dir.path(), registry()).expect("reopen");
        assert_eq!(reopened.len(), 1);
        let erika = reopened.get("dr._erika_(musterfrau)").expect("reloaded");
        assert_eq!(erika.properties["age"], "40");
        assert!(erika.graph.has_type(&erika.subject(), ff::CITIZEN));
    }

    #[test]
    fn delete_unknown_instance_fails() {
        let dir = tempdir().expect("tempdir");
        let store = InstanceStore::open(dir.path(), registry()).expect("open");
        assert!(matches!(store.delete("nobody"), Err(StoreError::UnknownInstance(_))));
    }
}
