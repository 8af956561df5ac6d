//! Generated shapes with their legal text and timestamps.

use crate::fsutil::{
    check_record_id, ensure_dir, read_to_string, record_dirs, remove_record_dir, write_atomic,
};
use crate::StoreError;
use chrono::{DateTime, Utc};
use lexshape_rdf::{parse_turtle, write_turtle, Graph};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const METADATA_FILE: &str = "metadata.yaml";
const LEGAL_TEXT_FILE: &str = "legal_text.txt";
const SHAPE_FILE: &str = "shape.ttl";

#[derive(Debug, Clone)]
pub struct ShaclShape {
    pub shape_id: String,
    pub legal_text: String,
    pub graph: Graph,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl ShaclShape {
    pub fn to_turtle(&self) -> String {
        write_turtle(&self.graph)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ShapeMetadata {
    shape_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug)]
pub struct ShapeStore {
    dir: PathBuf,
    shapes: RwLock<HashMap<String, ShaclShape>>,
}

impl ShapeStore {
    /// Open the store at `dir`, creating it if needed, and load every record.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        let store = Self {
            dir,
            shapes: RwLock::new(HashMap::new()),
        };
        store.load_all()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-read all records from disk. Unreadable records are skipped.
    pub fn load_all(&self) -> Result<usize, StoreError> {
        let mut loaded = HashMap::new();
        for record in record_dirs(&self.dir)? {
            match load_shape(&record) {
                Ok(shape) => {
                    loaded.insert(shape.shape_id.clone(), shape);
                }
                Err(err) => {
                    tracing::warn!(dir = %record.display(), error = %err, "skipping unreadable shape record");
                }
            }
        }
        let count = loaded.len();
        *self.shapes.write() = loaded;
        tracing::debug!(dir = %self.dir.display(), shapes = count, "loaded shape store");
        Ok(count)
    }

    /// Store a new shape, replacing any record with the same identifier.
    pub fn add(
        &self,
        shape_id: &str,
        legal_text: &str,
        graph: Graph,
        description: Option<String>,
    ) -> Result<ShaclShape, StoreError> {
        check_record_id(shape_id)?;
        let now = Utc::now();
        let shape = ShaclShape {
            shape_id: shape_id.to_string(),
            legal_text: legal_text.to_string(),
            graph,
            created_at: now,
            updated_at: now,
            description,
        };
        let mut shapes = self.shapes.write();
        self.save(&shape)?;
        tracing::info!(shape = %shape_id, "stored shape");
        shapes.insert(shape.shape_id.clone(), shape.clone());
        Ok(shape)
    }

    /// Replace the graph and refresh `updated_at`; a `Some` description
    /// replaces the stored one.
    pub fn update(
        &self,
        shape_id: &str,
        graph: Graph,
        description: Option<String>,
    ) -> Result<ShaclShape, StoreError> {
        self.modify(shape_id, |shape| {
            shape.graph = graph;
            if description.is_some() {
                shape.description = description;
            }
        })
    }

    /// Change only the description.
    pub fn set_description(
        &self,
        shape_id: &str,
        description: impl Into<String>,
    ) -> Result<ShaclShape, StoreError> {
        let description = description.into();
        self.modify(shape_id, |shape| shape.description = Some(description))
    }

    fn modify(
        &self,
        shape_id: &str,
        apply: impl FnOnce(&mut ShaclShape),
    ) -> Result<ShaclShape, StoreError> {
        let mut shapes = self.shapes.write();
        let shape = shapes
            .get_mut(shape_id)
            .ok_or_else(|| StoreError::UnknownShape(shape_id.to_string()))?;
        let mut updated = shape.clone();
        apply(&mut updated);
        updated.updated_at = Utc::now();
        self.save(&updated)?;
        *shape = updated.clone();
        tracing::info!(shape = %shape_id, "updated shape");
        Ok(updated)
    }

    pub fn get(&self, shape_id: &str) -> Option<ShaclShape> {
        self.shapes.read().get(shape_id).cloned()
    }

    pub fn contains(&self, shape_id: &str) -> bool {
        self.shapes.read().contains_key(shape_id)
    }

    pub fn len(&self) -> usize {
        self.shapes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All shapes, oldest first.
    pub fn list(&self) -> Vec<ShaclShape> {
        let mut shapes: Vec<ShaclShape> = self.shapes.read().values().cloned().collect();
        shapes.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.shape_id.cmp(&b.shape_id))
        });
        shapes
    }

    pub fn delete(&self, shape_id: &str) -> Result<(), StoreError> {
        let mut shapes = self.shapes.write();
        if !shapes.contains_key(shape_id) {
            return Err(StoreError::UnknownShape(shape_id.to_string()));
        }
        remove_record_dir(&self.dir.join(shape_id))?;
        shapes.remove(shape_id);
        tracing::info!(shape = %shape_id, "deleted shape");
        Ok(())
    }

    fn save(&self, shape: &ShaclShape) -> Result<(), StoreError> {
        let record = self.dir.join(&shape.shape_id);
        ensure_dir(&record)?;
        let metadata = ShapeMetadata {
            shape_id: shape.shape_id.clone(),
            created_at: shape.created_at,
            updated_at: shape.updated_at,
            description: shape.description.clone(),
        };
        write_atomic(&record.join(METADATA_FILE), &serde_yaml::to_string(&metadata)?)?;
        write_atomic(&record.join(LEGAL_TEXT_FILE), &shape.legal_text)?;
        write_atomic(&record.join(SHAPE_FILE), &write_turtle(&shape.graph))
    }
}

fn load_shape(record: &Path) -> Result<ShaclShape, StoreError> {
    let metadata: ShapeMetadata =
        serde_yaml::from_str(&read_to_string(&record.join(METADATA_FILE))?)?;
    let legal_text = read_to_string(&record.join(LEGAL_TEXT_FILE))?;
    let graph = parse_turtle(&read_to_string(&record.join(SHAPE_FILE))?)?;
    Ok(ShaclShape {
        shape_id: metadata.shape_id,
        legal_text,
        graph,
        created_at: metadata.created_at,
        updated_at: metadata.updated_at,
        description: metadata.description,
    })
}
