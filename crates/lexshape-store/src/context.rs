//! Generator context: feedback history and standing guidelines.

use crate::fsutil::{read_to_string, write_atomic};
use crate::StoreError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub text_id: String,
    pub feedback: String,
    /// Turtle serialization of the shape produced in response.
    pub improved_shape: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ContextDocument {
    #[serde(default)]
    feedback_history: Vec<FeedbackEntry>,
    #[serde(default)]
    general_guidelines: Vec<String>,
}

/// Single JSON document, rewritten on every mutation.
#[derive(Debug)]
pub struct GeneratorContext {
    path: Option<PathBuf>,
    state: RwLock<ContextDocument>,
}

impl GeneratorContext {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(ContextDocument::default()),
        }
    }

    /// Load `path`; a missing file yields an empty context.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = if path.exists() {
            serde_json::from_str(&read_to_string(&path)?)?
        } else {
            ContextDocument::default()
        };
        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn add_feedback(
        &self,
        text_id: &str,
        feedback: &str,
        improved_shape: &str,
    ) -> Result<(), StoreError> {
        let entries = self.modify(|state| {
            state.feedback_history.push(FeedbackEntry {
                text_id: text_id.to_string(),
                feedback: feedback.to_string(),
                improved_shape: improved_shape.to_string(),
            });
            Ok(state.feedback_history.len())
        })?;
        tracing::info!(text_id, entries, "recorded feedback");
        Ok(())
    }

    pub fn remove_feedback(&self, index: usize) -> Result<FeedbackEntry, StoreError> {
        self.modify(|state| {
            if index >= state.feedback_history.len() {
                return Err(StoreError::UnknownFeedback(index));
            }
            Ok(state.feedback_history.remove(index))
        })
    }

    pub fn add_guideline(&self, guideline: &str) -> Result<(), StoreError> {
        self.modify(|state| {
            state.general_guidelines.push(guideline.to_string());
            Ok(())
        })
    }

    pub fn remove_guideline(&self, index: usize) -> Result<String, StoreError> {
        self.modify(|state| {
            if index >= state.general_guidelines.len() {
                return Err(StoreError::UnknownGuideline(index));
            }
            Ok(state.general_guidelines.remove(index))
        })
    }

    /// Apply `change` to a copy, persist the copy, then swap it in. Memory is
    /// left untouched when either step fails.
    fn modify<T>(
        &self,
        change: impl FnOnce(&mut ContextDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.write();
        let mut updated = state.clone();
        let out = change(&mut updated)?;
        self.persist(&updated)?;
        *state = updated;
        Ok(out)
    }

    pub fn feedback_history(&self) -> Vec<FeedbackEntry> {
        self.state.read().feedback_history.clone()
    }

    pub fn guidelines(&self) -> Vec<String> {
        self.state.read().general_guidelines.clone()
    }

    /// Up to `max` entries in history order, skipping those recorded for
    /// `text_id` itself.
    pub fn relevant_feedback(&self, text_id: &str, max: usize) -> Vec<FeedbackEntry> {
        self.state
            .read()
            .feedback_history
            .iter()
            .filter(|entry| entry.text_id != text_id)
            .take(max)
            .cloned()
            .collect()
    }

    fn persist(&self, state: &ContextDocument) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => write_atomic(path, &serde_json::to_string_pretty(state)?),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn relevant_feedback_excludes_own_text_and_caps() {
        let ctx = GeneratorContext::in_memory();
        ctx.add_feedback("t1", "use ff:alter", "shape-a").expect("add");
        ctx.add_feedback("t2", "add minCount", "shape-b").expect("add");
        ctx.add_feedback("t3", "drop pattern", "shape-c").expect("add");

        let picked = ctx.relevant_feedback("t2", 5);
        let ids: Vec<&str> = picked.iter().map(|f| f.text_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
        assert_eq!(ctx.relevant_feedback("t9", 1).len(), 1);
    }

    #[test]
    fn persists_as_one_json_document() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("generator_context.json");
        let ctx = GeneratorContext::open(&path).expect("open");
        ctx.add_guideline("Prefer existing data fields").expect("add");
        ctx.add_guideline("Name every property shape").expect("add");
        ctx.add_feedback("t1", "fix", "shape").expect("add");
        assert_eq!(ctx.remove_guideline(0).expect("remove"), "Prefer existing data fields");
        assert!(matches!(ctx.remove_feedback(3), Err(StoreError::UnknownFeedback(3))));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw["general_guidelines"][0], "Name every property shape");
        assert_eq!(raw["feedback_history"][0]["text_id"], "t1");

        let reopened = GeneratorContext::open(&path).expect("reopen");
        assert_eq!(reopened.guidelines(), vec!["Name every property shape".to_string()]);
        assert_eq!(reopened.feedback_history().len(), 1);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("write");
        let ctx = GeneratorContext::open(blocker.join("generator_context.json")).expect("open");

        assert!(ctx.add_guideline("Prefer existing data fields").is_err());
        assert!(ctx.add_feedback("t1", "fix", "shape").is_err());
        assert!(ctx.guidelines().is_empty());
        assert!(ctx.feedback_history().is_empty());
    }

    #[test]
    fn concurrent_writers_lose_no_entries() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("generator_context.json");
        let ctx = Arc::new(GeneratorContext::open(&path).expect("open"));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        ctx.add_guideline(&format!("guideline {t}-{i}")).expect("guideline");
                        ctx.add_feedback(&format!("t{t}"), &format!("feedback {i}"), "shape")
                            .expect("feedback");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let reopened = GeneratorContext::open(&path).expect("reopen");
        let guidelines = reopened.guidelines();
        assert_eq!(guidelines.len(), 80);
        assert_eq!(reopened.feedback_history().len(), 80);
        for t in 0..8 {
            for i in 0..10 {
                assert!(guidelines.contains(&format!("guideline {t}-{i}")));
            }
        }
        assert_eq!(reopened.guidelines(), ctx.guidelines());
    }
}
