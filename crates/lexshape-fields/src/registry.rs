//! The field registry service.

use crate::datatype::XsdDatatype;
use crate::field::DataField;
use crate::import::{ImportSummary, ShaclImporter};
use crate::FieldError;
use lexshape_rdf::parse_turtle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
struct RegistryState {
    fields: Vec<DataField>,
    index: HashMap<String, usize>,
}

impl RegistryState {
    fn upsert(&mut self, field: DataField) {
        match self.index.get(&field.name) {
            Some(&i) => self.fields[i] = field,
            None => {
                self.index.insert(field.name.clone(), self.fields.len());
                self.fields.push(field);
            }
        }
    }

    fn get(&self, name: &str) -> Option<&DataField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut DataField> {
        self.index.get(name).map(|&i| &mut self.fields[i])
    }
}

/// Catalog of canonical field definitions.
///
/// One `RwLock` guards the whole catalog; every load-mutate-save sequence runs
/// under the write lock. Share it as `Arc<FieldRegistry>`.
#[derive(Debug)]
pub struct FieldRegistry {
    path: Option<PathBuf>,
    state: RwLock<RegistryState>,
}

impl FieldRegistry {
    /// Registry without backing storage.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Load the registry at `path`; a missing file yields an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FieldError> {
        let path = path.into();
        let state = if path.exists() {
            load_state(&path)?
        } else {
            RegistryState::default()
        };
        tracing::debug!(path = %path.display(), fields = state.fields.len(), "loaded field registry");
        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.state.read().fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all fields in insertion order.
    pub fn fields(&self) -> Vec<DataField> {
        self.state.read().fields.clone()
    }

    pub fn get_field(&self, name: &str) -> Option<DataField> {
        self.state.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().index.contains_key(name)
    }

    /// Insert or overwrite by name, then persist.
    pub fn add_field(&self, field: DataField) -> Result<(), FieldError> {
        self.add_fields([field])
    }

    /// Insert or overwrite several fields under one lock and one write. The
    /// in-memory catalog only changes once the write succeeded.
    pub fn add_fields(&self, fields: impl IntoIterator<Item = DataField>) -> Result<(), FieldError> {
        let mut state = self.state.write();
        let mut updated = state.clone();
        for field in fields {
            tracing::info!(field = %field.name, path = %field.path, "registering data field");
            updated.upsert(field);
        }
        self.persist(&updated)?;
        *state = updated;
        Ok(())
    }

    /// Exact case-insensitive match on name or synonym, else the first field
    /// whose name, synonym, or example contains the term. First match wins.
    pub fn find_matching_field(&self, term: &str, _context: &str) -> Option<DataField> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }
        let state = self.state.read();
        state
            .fields
            .iter()
            .find(|f| f.matches_exactly(&term))
            .or_else(|| state.fields.iter().find(|f| f.matches_partially(&term)))
            .cloned()
    }

    /// Change a field's datatype in memory; call [`FieldRegistry::save`] to persist.
    pub fn update_field_datatype(&self, name: &str, new_datatype: &str) -> Result<(), FieldError> {
        let mut state = self.state.write();
        let field = state
            .get_mut(name)
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        field.datatype = XsdDatatype::parse(new_datatype)?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), FieldError> {
        let state = self.state.read();
        self.persist(&state)
    }

    /// Parse a SHACL document and register every `ff:DataField` it defines.
    pub fn import_from_shacl(&self, document: &str) -> Result<ImportSummary, FieldError> {
        self.import_with(&ShaclImporter::default(), document)
    }

    pub fn import_with(
        &self,
        importer: &ShaclImporter,
        document: &str,
    ) -> Result<ImportSummary, FieldError> {
        let graph = parse_turtle(document)?;
        let extraction = importer.extract(&graph);

        let mut imported: Vec<String> = Vec::new();
        for field in &extraction.fields {
            if !imported.contains(&field.name) {
                imported.push(field.name.clone());
            }
        }

        if extraction.fields.is_empty() {
            tracing::warn!("no valid data fields were found in the SHACL content");
        } else {
            self.add_fields(extraction.fields)?;
        }

        Ok(ImportSummary {
            imported,
            failures: extraction.failures,
        })
    }

    /// Plain-text catalog listing for prompts.
    pub fn to_prompt_format(&self) -> String {
        let state = self.state.read();
        let mut lines = vec!["Available data fields:".to_string()];
        for field in &state.fields {
            lines.push(format!("\nField: {}", field.name));
            lines.push(format!("Path: {}", field.path));
            lines.push(format!("Type: {}", field.datatype));
            lines.push(format!("Description: {}", field.description));
            if !field.examples.is_empty() {
                lines.push(format!("Examples: {}", field.examples.join(", ")));
            }
            if !field.synonyms.is_empty() {
                lines.push(format!("Also known as: {}", field.synonyms.join(", ")));
            }
            if !field.constraints.is_empty() {
                let constraints: Vec<String> = field
                    .constraints
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect();
                lines.push(format!("Constraints: {}", constraints.join(", ")));
            }
        }
        lines.join("\n")
    }

    /// Draft a new field for `term` with a guessed datatype. Not registered.
    pub fn suggest_new_field(&self, term: &str) -> DataField {
        let lower = term.trim().to_lowercase();
        let name = lower.replace([' ', '-'], "_");
        let has_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        let has_word = |words: &[&str]| {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| words.contains(&w))
        };

        let datatype = if has_any(&["age", "years"]) {
            XsdDatatype::Integer
        } else if has_any(&["amount", "income", "payment", "euro"]) {
            XsdDatatype::Decimal
        } else if has_any(&["date", "time", "when"]) {
            XsdDatatype::Date
        } else if has_word(&["is", "has", "can"]) {
            XsdDatatype::Boolean
        } else {
            XsdDatatype::String
        };

        let mut field = DataField::new(
            name.clone(),
            format!("ex:{name}"),
            datatype,
            format!("Field for {term}"),
        );
        if term != name {
            field.synonyms.push(term.to_string());
        }
        field
    }

    fn persist(&self, state: &RegistryState) -> Result<(), FieldError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut doc = serde_yaml::Mapping::new();
        for field in &state.fields {
            doc.insert(
                serde_yaml::Value::String(field.name.clone()),
                serde_yaml::to_value(field)?,
            );
        }
        let text = serde_yaml::to_string(&doc)?;
        write_atomic(path, text.as_bytes())
    }
}

fn load_state(path: &Path) -> Result<RegistryState, FieldError> {
    let text = std::fs::read_to_string(path).map_err(|source| FieldError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut state = RegistryState::default();
    if text.trim().is_empty() {
        return Ok(state);
    }
    let doc: serde_yaml::Mapping = serde_yaml::from_str(&text)?;
    for (key, value) in doc {
        let field: DataField = serde_yaml::from_value(value)?;
        if key.as_str() != Some(field.name.as_str()) {
            tracing::warn!(key = ?key, field = %field.name, "registry key differs from field name; using field name");
        }
        state.upsert(field);
    }
    Ok(state)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FieldError> {
    let io_err = |source| FieldError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, bytes).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{constraint_keys, AnswerOption, ConstraintValue};
    use tempfile::tempdir;

    fn sample_field() -> DataField {
        let mut field = DataField::new(
            "einkommen",
            "ff:einkommen",
            XsdDatatype::String,
            "Income category",
        );
        field.synonyms.push("income".into());
        field.examples.push("Selbständig (einkommen-ao-selbstaendig)".into());
        field.constraints.insert(
            constraint_keys::ALLOWED_VALUES.into(),
            ConstraintValue::Options(vec![AnswerOption {
                id: "einkommen-ao-selbstaendig".into(),
                label: "Selbständig".into(),
            }]),
        );
        field
            .constraints
            .insert(constraint_keys::MIN_COUNT.into(), ConstraintValue::Text("1".into()));
        field
    }

    #[test]
    fn failed_write_keeps_the_previous_catalog() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("write");
        let registry = FieldRegistry::open(blocker.join("datafields.yaml")).expect("open");

        assert!(registry.add_field(sample_field()).is_err());
        assert!(registry.is_empty());
        assert!(registry.get_field("einkommen").is_none());
    }

    #[test]
    fn concurrent_registrations_all_reach_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("datafields.yaml");
        let registry = std::sync::Arc::new(FieldRegistry::open(&path).expect("open"));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let name = format!("field_{t}_{i}");
                        let field = DataField::new(&name, &format!("ff:{name}"), XsdDatatype::Integer, "x");
                        registry.add_field(field).expect("add");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let reloaded = FieldRegistry::open(&path).expect("reopen");
        assert_eq!(reloaded.len(), 80);
        for t in 0..8 {
            for i in 0..10 {
                assert!(reloaded.contains(&format!("field_{t}_{i}")));
            }
        }
    }

    #[test]
    fn save_then_open_round_trips() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("datafields.yaml");
        let registry = FieldRegistry::open(&path).expect("open");
        registry.add_field(sample_field()).expect("add");
        registry
            .add_field(DataField::new("age", "ff:age", XsdDatatype::Integer, "Age"))
            .expect("add");

        let reloaded = FieldRegistry::open(&path).expect("reopen");
        assert_eq!(reloaded.fields(), registry.fields());
        let names: Vec<String> = reloaded.fields().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["einkommen", "age"]);
    }

    #[test]
    fn matching_prefers_exact_then_first_partial() {
        let registry = FieldRegistry::in_memory();
        registry
            .add_field(DataField::new("age_of_child", "ff:age_of_child", XsdDatatype::Integer, "x"))
            .expect("add");
        registry.add_field(sample_field()).expect("add");
        registry
            .add_field(DataField::new("age", "ff:age", XsdDatatype::Integer, "x"))
            .expect("add");

        assert_eq!(registry.find_matching_field("AGE", "").map(|f| f.name).as_deref(), Some("age"));
        assert_eq!(
            registry.find_matching_field("Income", "").map(|f| f.name).as_deref(),
            Some("einkommen")
        );
        assert_eq!(
            registry.find_matching_field("selbst", "").map(|f| f.name).as_deref(),
            Some("einkommen")
        );
        assert!(registry.find_matching_field("pension", "").is_none());
    }

    #[test]
    fn datatype_updates_are_checked() {
        let registry = FieldRegistry::in_memory();
        registry.add_field(sample_field()).expect("add");
        assert!(matches!(
            registry.update_field_datatype("missing", "xsd:integer"),
            Err(FieldError::UnknownField(_))
        ));
        assert!(matches!(
            registry.update_field_datatype("einkommen", "integer"),
            Err(FieldError::InvalidDatatype(_))
        ));
        registry
            .update_field_datatype("einkommen", "xsd:decimal")
            .expect("update");
        assert_eq!(
            registry.get_field("einkommen").map(|f| f.datatype),
            Some(XsdDatatype::Decimal)
        );
    }

    #[test]
    fn suggestions_guess_datatypes() {
        let registry = FieldRegistry::in_memory();
        let age = registry.suggest_new_field("Age of Applicant");
        assert_eq!(age.name, "age_of_applicant");
        assert_eq!(age.path, "ex:age_of_applicant");
        assert_eq!(age.datatype, XsdDatatype::Integer);
        assert_eq!(age.synonyms, vec!["Age of Applicant".to_string()]);

        assert_eq!(registry.suggest_new_field("monthly income").datatype, XsdDatatype::Decimal);
        assert_eq!(registry.suggest_new_field("birth date").datatype, XsdDatatype::Date);
        assert_eq!(registry.suggest_new_field("has children").datatype, XsdDatatype::Boolean);
        assert_eq!(registry.suggest_new_field("nationality").datatype, XsdDatatype::String);
        assert!(registry.suggest_new_field("nationality").synonyms.is_empty());
    }

    #[test]
    fn prompt_catalog_lists_fields() {
        let registry = FieldRegistry::in_memory();
        registry.add_field(sample_field()).expect("add");
        let text = registry.to_prompt_format();
        assert!(text.starts_with("Available data fields:"));
        assert!(text.contains("Field: einkommen"));
        assert!(text.contains("Path: ff:einkommen"));
        assert!(text.contains("Type: xsd:string"));
        assert!(text.contains("Also known as: income"));
        assert!(text.contains("allowed_values: [einkommen-ao-selbstaendig]"));
    }
}
