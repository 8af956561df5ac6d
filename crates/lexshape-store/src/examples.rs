//! Few-shot example mappings: legal text paired with a reference shape.

use crate::fsutil::{
    check_record_id, ensure_dir, read_to_string, record_dirs, remove_record_dir, write_atomic,
};
use crate::StoreError;
use lexshape_rdf::{parse_turtle, write_turtle, Graph};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const LEGAL_TEXT_FILE: &str = "legal_text.txt";
const SHAPE_FILE: &str = "shape.ttl";
const ANNOTATIONS_FILE: &str = "annotations.yaml";

#[derive(Debug, Clone, PartialEq)]
pub struct ExampleMapping {
    /// Directory name of the record.
    pub name: String,
    pub legal_text: String,
    pub shape: Graph,
    pub annotations: Option<BTreeMap<String, String>>,
}

impl ExampleMapping {
    pub fn shape_turtle(&self) -> String {
        write_turtle(&self.shape)
    }
}

/// Ordered example corpus; index positions are those of [`ExampleStore::list`].
#[derive(Debug)]
pub struct ExampleStore {
    dir: PathBuf,
    examples: RwLock<Vec<ExampleMapping>>,
}

impl ExampleStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        let store = Self {
            dir,
            examples: RwLock::new(Vec::new()),
        };
        store.load_all()?;
        Ok(store)
    }

    /// Reload every directory holding both `legal_text.txt` and `shape.ttl`,
    /// in directory-name order.
    pub fn load_all(&self) -> Result<usize, StoreError> {
        let mut loaded = Vec::new();
        for record in record_dirs(&self.dir)? {
            if !record.join(LEGAL_TEXT_FILE).exists() || !record.join(SHAPE_FILE).exists() {
                continue;
            }
            match load_example(&record) {
                Ok(example) => loaded.push(example),
                Err(err) => {
                    tracing::warn!(dir = %record.display(), error = %err, "skipping unreadable example");
                }
            }
        }
        let count = loaded.len();
        *self.examples.write() = loaded;
        tracing::debug!(dir = %self.dir.display(), examples = count, "loaded example store");
        Ok(count)
    }

    /// Persist an example under `name`; an existing example of that name is
    /// replaced in place.
    pub fn add(
        &self,
        name: &str,
        legal_text: &str,
        shape: Graph,
        annotations: Option<BTreeMap<String, String>>,
    ) -> Result<ExampleMapping, StoreError> {
        check_record_id(name)?;
        let example = ExampleMapping {
            name: name.to_string(),
            legal_text: legal_text.to_string(),
            shape,
            annotations: annotations.filter(|a| !a.is_empty()),
        };
        let mut examples = self.examples.write();
        self.save(&example)?;
        match examples.iter_mut().find(|e| e.name == example.name) {
            Some(existing) => *existing = example.clone(),
            None => examples.push(example.clone()),
        }
        tracing::info!(example = %name, "stored example");
        Ok(example)
    }

    /// Read legal text, Turtle shape and optional YAML annotations from files.
    pub fn add_from_files(
        &self,
        name: &str,
        legal_text_path: &Path,
        shape_path: &Path,
        annotations_path: Option<&Path>,
    ) -> Result<ExampleMapping, StoreError> {
        let legal_text = read_to_string(legal_text_path)?;
        let shape = parse_turtle(&read_to_string(shape_path)?)?;
        let annotations = match annotations_path {
            Some(path) if path.exists() => Some(serde_yaml::from_str(&read_to_string(path)?)?),
            _ => None,
        };
        self.add(name, &legal_text, shape, annotations)
    }

    pub fn list(&self) -> Vec<ExampleMapping> {
        self.examples.read().clone()
    }

    /// The first `max` examples, in store order.
    pub fn first(&self, max: usize) -> Vec<ExampleMapping> {
        self.examples.read().iter().take(max).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.examples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the example at `index` together with its directory.
    pub fn delete(&self, index: usize) -> Result<ExampleMapping, StoreError> {
        let mut examples = self.examples.write();
        if index >= examples.len() {
            return Err(StoreError::UnknownExample(index));
        }
        remove_record_dir(&self.dir.join(&examples[index].name))?;
        let removed = examples.remove(index);
        tracing::info!(example = %removed.name, index, "deleted example");
        Ok(removed)
    }

    fn save(&self, example: &ExampleMapping) -> Result<(), StoreError> {
        let record = self.dir.join(&example.name);
        ensure_dir(&record)?;
        write_atomic(&record.join(LEGAL_TEXT_FILE), &example.legal_text)?;
        write_atomic(&record.join(SHAPE_FILE), &write_turtle(&example.shape))?;
        let annotations = record.join(ANNOTATIONS_FILE);
        match &example.annotations {
            Some(map) => write_atomic(&annotations, &serde_yaml::to_string(map)?),
            None => remove_file_if_present(&annotations),
        }
    }
}

fn remove_file_if_present(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_example(record: &Path) -> Result<ExampleMapping, StoreError> {
    let name = record
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let legal_text = read_to_string(&record.join(LEGAL_TEXT_FILE))?;
    let shape = parse_turtle(&read_to_string(&record.join(SHAPE_FILE))?)?;
    let annotations_path = record.join(ANNOTATIONS_FILE);
    let annotations = if annotations_path.exists() {
        Some(serde_yaml::from_str(&read_to_string(&annotations_path)?)?)
    } else {
        None
    };
    Ok(ExampleMapping {
        name,
        legal_text,
        shape,
        annotations,
    })
}
