//! Service wiring for one workspace directory.

use anyhow::{Context, Result};
use lexshape_fields::FieldRegistry;
use lexshape_llm::{connect, LlmConfig, ShapeGenerator};
use lexshape_store::{ExampleStore, GeneratorContext, InstanceStore, ShapeStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const LEXSHAPE_WORKSPACE_ENV: &str = "LEXSHAPE_WORKSPACE";
const DEFAULT_WORKSPACE_DIR: &str = "workspace";

/// All stores of a workspace, each opened once and shared by `Arc`.
pub struct Workspace {
    pub root: PathBuf,
    pub registry: Arc<FieldRegistry>,
    pub examples: Arc<ExampleStore>,
    pub context: Arc<GeneratorContext>,
    pub shapes: Arc<ShapeStore>,
    pub instances: Arc<InstanceStore>,
}

impl Workspace {
    /// `--workspace` flag, else `$LEXSHAPE_WORKSPACE`, else `./workspace`.
    pub fn resolve_root(flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| {
            std::env::var_os(LEXSHAPE_WORKSPACE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE_DIR))
    }

    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create workspace {}", root.display()))?;

        let registry = Arc::new(
            FieldRegistry::open(root.join("datafields.yaml"))
                .context("failed to load the field registry")?,
        );
        let examples = Arc::new(
            ExampleStore::open(root.join("examples")).context("failed to open the example store")?,
        );
        let context = Arc::new(
            GeneratorContext::open(root.join("generator_context.json"))
                .context("failed to load the generator context")?,
        );
        let shapes = Arc::new(
            ShapeStore::open(root.join("shapes")).context("failed to open the shape store")?,
        );
        let instances = Arc::new(
            InstanceStore::open(root.join("instances"), registry.clone())
                .context("failed to open the instance store")?,
        );
        tracing::debug!(
            root = %root.display(),
            fields = registry.len(),
            examples = examples.len(),
            shapes = shapes.len(),
            instances = instances.len(),
            "opened workspace"
        );

        Ok(Self {
            root,
            registry,
            examples,
            context,
            shapes,
            instances,
        })
    }

    /// Generator wired to the completion backend configured in the environment.
    pub fn generator(&self) -> Result<ShapeGenerator> {
        let config = LlmConfig::from_env().context("failed to configure the LLM backend")?;
        let completion = connect(&config)?;
        Ok(ShapeGenerator::new(self.registry.clone(), self.context.clone(), completion)
            .with_examples(self.examples.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn flag_wins_over_default() {
        assert_eq!(
            Workspace::resolve_root(Some(PathBuf::from("/srv/lexshape"))),
            PathBuf::from("/srv/lexshape")
        );
    }

    #[test]
    fn open_creates_layout() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("ws");
        let ws = Workspace::open(&root).expect("open");
        assert!(root.join("examples").is_dir());
        assert!(root.join("shapes").is_dir());
        assert!(root.join("instances").is_dir());
        assert!(ws.registry.is_empty());
        assert!(ws.shapes.is_empty());
    }
}
